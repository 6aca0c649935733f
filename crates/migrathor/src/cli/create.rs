use clap::Parser;
use console::style;

use migrathor_runtime::Migrator;

use super::{Failure, GlobalArgs};

/// Create a new, empty migration file.
#[derive(Parser)]
pub struct CreateCommand {
    /// Descriptive name, e.g. `create_user_table`.
    #[arg(default_value = "placeholder")]
    pub name: String,
}

impl CreateCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<(), Failure> {
        let config = global.load_config().map_err(Failure::Setup)?;
        let migrator = config
            .migrator_config()
            .and_then(Migrator::new)
            .map_err(|e| Failure::Setup(e.into()))?;

        let file = migrator
            .create(&self.name)
            .map_err(|e| Failure::Create(e.into()))?;

        println!(
            "  {} Created {}",
            style("✓").green(),
            style(migrator.config().path.join(&file).display()).cyan()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("migrations");
        let global = GlobalArgs {
            config: Some(dir.path().join("migrathor.toml")),
            path: Some(migrations.clone()),
            ..Default::default()
        };
        std::fs::write(dir.path().join("migrathor.toml"), "").unwrap();

        CreateCommand {
            name: "Create_User_Table".into(),
        }
        .execute(&global)
        .unwrap();

        let files: Vec<String> = std::fs::read_dir(&migrations)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("_create_user_table.sql"));
    }

    #[test]
    fn test_invalid_table_is_a_setup_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("migrathor.toml"), "").unwrap();
        let global = GlobalArgs {
            config: Some(dir.path().join("migrathor.toml")),
            path: Some(dir.path().join("migrations")),
            table: Some("bad table; drop".into()),
            ..Default::default()
        };

        let failure = CreateCommand {
            name: "x".into(),
        }
        .execute(&global)
        .unwrap_err();
        assert_eq!(failure.exit_code(), 2);
    }
}
