//! Built-in descriptions of the six seeded cities.

/// One built-in document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusDocument {
    pub city: &'static str,
    pub text: &'static str,
}

impl CorpusDocument {
    /// Stable source ID, so re-seeding finds the existing entry.
    pub fn source_id(&self) -> String {
        format!("corpus:{}", slug(self.city))
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub const CITY_DESCRIPTIONS: [CorpusDocument; 6] = [
    CorpusDocument {
        city: "New York City",
        text: "New York City is the most populous city in the United States, spread across five \
boroughs: Manhattan, Brooklyn, Queens, the Bronx and Staten Island. It sits at the mouth of the \
Hudson River on one of the largest natural harbors in the world.\n\n\
Founded as the Dutch trading post of New Amsterdam in 1624, the settlement was renamed New York \
after the English took control in 1664. It served briefly as the first capital of the United \
States under the Constitution, and Ellis Island later became the gateway for millions of \
immigrants.\n\n\
Today New York is a global center of finance, media and the arts. Wall Street, Broadway theaters, \
Central Park and the Statue of Liberty draw visitors from around the world, and its subway system \
runs around the clock.",
    },
    CorpusDocument {
        city: "Los Angeles",
        text: "Los Angeles is the largest city in California and the heart of a sprawling \
metropolitan region in Southern California, bounded by mountains and the Pacific Ocean.\n\n\
The city grew from El Pueblo de Los Angeles, a Spanish farming settlement founded in 1781. It \
passed to Mexico and then to the United States in 1848. Railroads, oil discoveries and water \
brought through the Los Angeles Aqueduct fueled rapid growth in the early twentieth century.\n\n\
Los Angeles is known worldwide as the home of Hollywood and the film and television industry. \
Its Mediterranean climate, beaches, freeway network and diverse neighborhoods shape daily life, \
and its ports are among the busiest in the country.",
    },
    CorpusDocument {
        city: "Chicago",
        text: "Chicago is the largest city in Illinois and sits on the southwestern shore of Lake \
Michigan. It is a major hub for transportation, finance and industry in the Midwest.\n\n\
The history of Chicago began with a portage between the Great Lakes and the Mississippi River \
basin. Incorporated as a city in 1837, Chicago grew explosively as a railroad and shipping \
center. The Great Chicago Fire of 1871 destroyed several square miles of the city, and the \
rebuilding that followed made Chicago a birthplace of the skyscraper. The city hosted the \
World's Columbian Exposition in 1893, and during the twentieth century it became known for its \
stockyards, steel mills, jazz and blues.\n\n\
Modern Chicago is famous for its architecture along the Chicago River, its museums, deep-dish \
pizza and sports teams such as the Cubs and the Bulls.",
    },
    CorpusDocument {
        city: "Houston",
        text: "Houston is the most populous city in Texas and lies near the Gulf of Mexico, \
connected to the sea by the Houston Ship Channel.\n\n\
The city was founded in 1836 on the banks of Buffalo Bayou and named after Sam Houston, the \
general who won Texas independence. The discovery of oil at nearby Spindletop and the opening \
of the ship channel in 1914 turned Houston into an energy and industrial powerhouse.\n\n\
Houston is home to the Johnson Space Center, where NASA's mission control guided the Apollo \
moon landings, and to the Texas Medical Center, the largest medical complex in the world. The \
city is known for its ethnic diversity, its food scene and its hot, humid climate.",
    },
    CorpusDocument {
        city: "Miami",
        text: "Miami is a coastal city in southeastern Florida, set between the Everglades and \
Biscayne Bay. It is a center of international trade and a major gateway to Latin America and \
the Caribbean.\n\n\
Miami was incorporated in 1896, shortly after the Florida East Coast Railway reached the area. \
A land boom in the 1920s and waves of immigration, especially from Cuba after 1959, shaped its \
growth and its strongly bilingual culture.\n\n\
Miami is known for Miami Beach, the pastel Art Deco buildings of South Beach, its nightlife and \
its cruise port, one of the busiest in the world. Its tropical climate brings warm winters and \
a hurricane season each summer and fall.",
    },
    CorpusDocument {
        city: "Seattle",
        text: "Seattle is the largest city in Washington state, built on hills between Puget \
Sound and Lake Washington, with views of Mount Rainier to the southeast.\n\n\
Named after Chief Seattle of the Duwamish and Suquamish peoples, the city was settled in the \
1850s and grew through logging and shipping. The Klondike Gold Rush of 1897 made it a supply \
hub for prospectors heading north, and the 1962 World's Fair left behind the Space Needle.\n\n\
Seattle is a center of aerospace and technology and is known for its coffee culture, its music \
scene, the Pike Place Market and its mild, rainy climate.",
    },
];
