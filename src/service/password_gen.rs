use crate::error::MazeError;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,.?";

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub length: usize,
    pub uppercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            length: 20,
            uppercase: true,
            digits: true,
            symbols: true,
        }
    }
}

/// Random password with at least one character from every enabled class.
/// Visually ambiguous characters (`l`, `I`, `O`, `0`, `1`) are left out.
pub fn generate(opts: &GenerateOptions) -> Result<String, MazeError> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&opts.length) {
        return Err(MazeError::validation(format!(
            "length must be between {MIN_LENGTH} and {MAX_LENGTH}"
        )));
    }

    let mut classes: Vec<&[u8]> = vec![LOWER];
    if opts.uppercase {
        classes.push(UPPER);
    }
    if opts.digits {
        classes.push(DIGITS);
    }
    if opts.symbols {
        classes.push(SYMBOLS);
    }
    let pool: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();

    let mut rng = rand::thread_rng();
    let mut out: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while out.len() < opts.length {
        out.push(pool[rng.gen_range(0..pool.len())]);
    }
    out.shuffle(&mut rng);

    Ok(out.into_iter().map(char::from).collect())
}
