/// BFS municipality number.
pub type Code = u32;

/// Codes at or above this value are lakes (>= 9000) or foreign territory.
pub const NON_MUNICIPAL_FLOOR: Code = 7000;

/// Territories shared by several municipalities (Kommunanzen) and
/// uninhabited state forests. They carry a code but never count as a
/// municipality of any state.
pub const SHARED_TERRITORIES: [(Code, &str); 8] = [
    (2285, "Staatswald Galm"),
    (2391, "Staatswald Galm"),
    (5020, "C'za Medeglia/Robasacco"),
    (5391, "C'za Cadenazzo/Monteceneri"),
    (5238, "C'za Corticiasca/Valcolla"),
    (5394, "C'za Capriasca/Lugano"),
    (6072, "Kommunanz Gluringen-Ritzingen"),
    (6391, "Kommunanz Reckingen-Gluringen/Grafschaft"),
];

pub fn is_shared_territory(code: Code) -> bool {
    SHARED_TERRITORIES.iter().any(|(c, _)| *c == code)
}

pub fn is_non_municipal(code: Code) -> bool {
    code >= NON_MUNICIPAL_FLOOR
}

/// True for codes that must be ignored when reasoning about which state a
/// code set belongs to.
pub fn is_reserved(code: Code) -> bool {
    is_shared_territory(code) || is_non_municipal(code)
}
