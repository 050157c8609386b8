use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// DSSP secondary-structure code of a single residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecondaryStructure {
    AlphaHelix,    // H
    ThreeTenHelix, // G
    PiHelix,       // I
    PolyProline,   // P
    Strand,        // E
    Bridge,        // B
    Turn,          // T
    Bend,          // S
    Coil,          // C, or blank in DSSP output
}

/// Coarse class used to select templates and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureClass {
    Helix,
    Sheet,
    Turn,
    Bend,
    Coil,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid secondary structure code: '{0}'")]
pub struct ParseSecondaryStructureError(pub char);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid structure class: '{0}'")]
pub struct ParseStructureClassError(pub String);

impl SecondaryStructure {
    /// Parses a one-letter DSSP code. A blank is coil, as in DSSP output.
    pub fn from_code(code: char) -> Result<Self, ParseSecondaryStructureError> {
        match code.to_ascii_uppercase() {
            'H' => Ok(Self::AlphaHelix),
            'G' => Ok(Self::ThreeTenHelix),
            'I' => Ok(Self::PiHelix),
            'P' => Ok(Self::PolyProline),
            'E' => Ok(Self::Strand),
            'B' => Ok(Self::Bridge),
            'T' => Ok(Self::Turn),
            'S' => Ok(Self::Bend),
            'C' | ' ' | '-' => Ok(Self::Coil),
            _ => Err(ParseSecondaryStructureError(code)),
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::AlphaHelix => 'H',
            Self::ThreeTenHelix => 'G',
            Self::PiHelix => 'I',
            Self::PolyProline => 'P',
            Self::Strand => 'E',
            Self::Bridge => 'B',
            Self::Turn => 'T',
            Self::Bend => 'S',
            Self::Coil => 'C',
        }
    }

    pub fn class(&self) -> StructureClass {
        match self {
            Self::AlphaHelix | Self::ThreeTenHelix | Self::PiHelix => StructureClass::Helix,
            Self::Strand | Self::Bridge => StructureClass::Sheet,
            Self::Turn => StructureClass::Turn,
            Self::Bend => StructureClass::Bend,
            Self::PolyProline | Self::Coil => StructureClass::Coil,
        }
    }
}

impl fmt::Display for SecondaryStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl StructureClass {
    /// Class shared by all inputs, or [`StructureClass::Coil`] when they differ.
    pub fn common<I>(classes: I) -> StructureClass
    where
        I: IntoIterator<Item = StructureClass>,
    {
        let mut iter = classes.into_iter();
        let Some(first) = iter.next() else {
            return StructureClass::Coil;
        };
        if iter.all(|class| class == first) {
            first
        } else {
            StructureClass::Coil
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureClass::Helix => "helix",
            StructureClass::Sheet => "sheet",
            StructureClass::Turn => "turn",
            StructureClass::Bend => "bend",
            StructureClass::Coil => "coil",
        }
    }
}

impl fmt::Display for StructureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureClass {
    type Err = ParseStructureClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helix" => Ok(StructureClass::Helix),
            "sheet" | "strand" => Ok(StructureClass::Sheet),
            "turn" => Ok(StructureClass::Turn),
            "bend" => Ok(StructureClass::Bend),
            "coil" => Ok(StructureClass::Coil),
            _ => Err(ParseStructureClassError(s.to_string())),
        }
    }
}
