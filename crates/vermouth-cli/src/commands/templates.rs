use crate::cli::TemplatesArgs;
use crate::error::{CliError, Result};
use tracing::info;
use vermouth::core::templates::TemplateLibrary;

pub async fn run(args: TemplatesArgs) -> Result<()> {
    let library = load_library(&args)?;
    info!(
        templates = library.len(),
        modifications = library.modification_count(),
        "Template library loaded."
    );

    let residues = library.residue_names();
    println!(
        "{} templates covering {} residue names, {} modifications:",
        library.len(),
        residues.len(),
        library.modification_count()
    );
    for line in residues
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .chunks(12)
    {
        println!("  {}", line.join(" "));
    }
    Ok(())
}

fn load_library(args: &TemplatesArgs) -> Result<TemplateLibrary> {
    let mut library = if args.no_builtin {
        TemplateLibrary::new()
    } else {
        TemplateLibrary::builtin()
            .map_err(|e| CliError::Other(e.into()))?
            .clone()
    };
    for path in &args.templates {
        info!("Merging templates from {:?}", path);
        library.merge(TemplateLibrary::load(path).map_err(|e| CliError::parsing(path, e))?);
    }
    if library.is_empty() {
        return Err(CliError::Argument(
            "No templates to list: pass --templates when using --no-builtin.".to_string(),
        ));
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const EXTRA: &str = r#"
        [[template]]
        name = "HOH"
        residues = ["HOH"]
        atoms = [{ name = "OW", element = "O" }]
        [[template.beads]]
        name = "W"
        type = "P4"
        atoms = ["OW"]
    "#;

    #[test]
    fn builtin_library_covers_standard_amino_acids() {
        let library = load_library(&TemplatesArgs {
            templates: Vec::new(),
            no_builtin: false,
        })
        .unwrap();
        let residues = library.residue_names();
        for name in ["ALA", "GLY", "SER", "LYS", "TRP"] {
            assert!(residues.contains(name), "{name} missing");
        }
    }

    #[test]
    fn user_files_are_listed_alone_without_builtins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("water.toml");
        fs::write(&path, EXTRA).unwrap();

        let library = load_library(&TemplatesArgs {
            templates: vec![path],
            no_builtin: true,
        })
        .unwrap();
        assert_eq!(library.len(), 1);
        assert!(library.residue_names().contains("HOH"));
    }

    #[test]
    fn empty_library_is_an_error() {
        let result = load_library(&TemplatesArgs {
            templates: Vec::new(),
            no_builtin: true,
        });
        assert!(matches!(result, Err(CliError::Argument(_))));
    }
}
