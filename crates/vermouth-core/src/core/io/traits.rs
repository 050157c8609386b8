use crate::core::models::builder::BuildOptions;
use crate::core::models::coarse::CoarseGrainedGraph;
use crate::core::models::system::MolecularSystem;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Formats an atomistic structure can be read from.
pub trait MolecularFile {
    /// Format-specific information that is not part of the molecule graph.
    type Metadata;

    type Error: Error + From<io::Error>;

    /// Reads a molecule graph, completing its bonds according to `options`.
    fn read_from(
        reader: &mut impl BufRead,
        options: BuildOptions,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
        options: BuildOptions,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }
}

/// Formats a coarse-grained graph can be written to.
pub trait CoarseGrainedFile {
    type Options;

    type Error: Error + From<io::Error>;

    fn write_to(
        graph: &CoarseGrainedGraph,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn write_to_path<P: AsRef<Path>>(
        graph: &CoarseGrainedGraph,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(graph, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
