use phf::{Map, phf_map};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements found in biomolecular structures.
///
/// Anything outside this set parses as [`Element::Unknown`] only when read
/// from an atom name; an explicit symbol that is not recognized is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    C,
    N,
    O,
    S,
    P,
    Se,
    F,
    Cl,
    Br,
    I,
    Na,
    K,
    Mg,
    Ca,
    Mn,
    Fe,
    Cu,
    Zn,
    Unknown,
}

static ELEMENT_SYMBOLS: Map<&'static str, Element> = phf_map! {
    "H" => Element::H, "D" => Element::H,
    "C" => Element::C,
    "N" => Element::N,
    "O" => Element::O,
    "S" => Element::S,
    "P" => Element::P,
    "SE" => Element::Se,
    "F" => Element::F,
    "CL" => Element::Cl,
    "BR" => Element::Br,
    "I" => Element::I,
    "NA" => Element::Na,
    "K" => Element::K,
    "MG" => Element::Mg,
    "CA" => Element::Ca,
    "MN" => Element::Mn,
    "FE" => Element::Fe,
    "CU" => Element::Cu,
    "ZN" => Element::Zn,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    /// Standard atomic weight in g/mol. Unknown elements weigh nothing.
    pub fn atomic_mass(&self) -> f64 {
        match self {
            Element::H => 1.008,
            Element::C => 12.011,
            Element::N => 14.007,
            Element::O => 15.999,
            Element::S => 32.06,
            Element::P => 30.974,
            Element::Se => 78.971,
            Element::F => 18.998,
            Element::Cl => 35.45,
            Element::Br => 79.904,
            Element::I => 126.90,
            Element::Na => 22.990,
            Element::K => 39.098,
            Element::Mg => 24.305,
            Element::Ca => 40.078,
            Element::Mn => 54.938,
            Element::Fe => 55.845,
            Element::Cu => 63.546,
            Element::Zn => 65.38,
            Element::Unknown => 0.0,
        }
    }

    /// Single-bond covalent radius in Angstroms.
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::S => 1.05,
            Element::P => 1.07,
            Element::Se => 1.20,
            Element::F => 0.57,
            Element::Cl => 1.02,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Na => 1.66,
            Element::K => 2.03,
            Element::Mg => 1.41,
            Element::Ca => 1.76,
            Element::Mn => 1.39,
            Element::Fe => 1.32,
            Element::Cu => 1.32,
            Element::Zn => 1.22,
            Element::Unknown => 0.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::S => "S",
            Element::P => "P",
            Element::Se => "Se",
            Element::F => "F",
            Element::Cl => "Cl",
            Element::Br => "Br",
            Element::I => "I",
            Element::Na => "Na",
            Element::K => "K",
            Element::Mg => "Mg",
            Element::Ca => "Ca",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Unknown => "X",
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        matches!(self, Element::H)
    }

    /// Guesses the element from a PDB-style atom name when no element column
    /// is available. Leading digits are ignored ("1HB" is a hydrogen) and
    /// only the first letter is used, which is correct for the organic
    /// elements that make up polymer residues.
    pub fn from_atom_name(name: &str) -> Element {
        name.trim()
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .and_then(|c| {
                let symbol = c.to_ascii_uppercase().to_string();
                ELEMENT_SYMBOLS.get(symbol.as_str()).copied()
            })
            .unwrap_or(Element::Unknown)
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        ELEMENT_SYMBOLS
            .get(key.as_str())
            .copied()
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        symbol.parse().map_err(serde::de::Error::custom)
    }
}
