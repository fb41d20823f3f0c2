/// Read-only ECO reference row, seeded once; used to resolve `opening_name`
/// when a provider or PGN header omits it.
#[derive(Debug, Clone)]
pub struct Opening {
    pub eco_code: String,
    pub name: String,
    pub moves: String,
    pub ply: i32,
}
