//! Seed catalog used to bootstrap an empty merchant directory.

pub const MERCHANT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Restaurants",
        &[
            "McDonald's",
            "Starbucks",
            "Subway",
            "Pizza Hut",
            "KFC",
            "Burger King",
            "Domino's Pizza",
            "Taco Bell",
            "Chipotle",
            "Panera Bread",
        ],
    ),
    (
        "Grocery",
        &[
            "Walmart",
            "Target",
            "Kroger",
            "Safeway",
            "Whole Foods",
            "Costco",
            "Sam's Club",
            "Trader Joe's",
            "Aldi",
            "Publix",
        ],
    ),
    (
        "Gas Stations",
        &[
            "Shell", "Exxon", "BP", "Chevron", "Mobil", "Texaco", "76", "Arco", "Citgo", "Sunoco",
        ],
    ),
    (
        "Entertainment",
        &[
            "Netflix",
            "Spotify",
            "Amazon Prime",
            "Disney+",
            "Hulu",
            "Apple Music",
            "YouTube Premium",
            "HBO Max",
            "Paramount+",
        ],
    ),
    (
        "Transportation",
        &[
            "Uber",
            "Lyft",
            "Metro",
            "Bus Pass",
            "Parking Meter",
            "Gas Station",
            "Car Wash",
            "Auto Repair",
        ],
    ),
];

pub fn merchants() -> impl Iterator<Item = &'static str> {
    MERCHANT_CATEGORIES
        .iter()
        .flat_map(|(_, merchants)| merchants.iter().copied())
}

pub fn category_of(merchant: &str) -> Option<&'static str> {
    MERCHANT_CATEGORIES
        .iter()
        .find(|(_, merchants)| merchants.contains(&merchant))
        .map(|(category, _)| *category)
}
