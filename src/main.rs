#[cfg(feature = "cli")]
mod cli {
    use anyhow::{Context, Result, bail};
    use clap::{Parser, Subcommand};
    use std::path::{Path, PathBuf};

    use erdsync::core::auto_layout::{force_layout, grid_layout};
    use erdsync::core::{
        Config, ParseReport, SchemaExporter, SchemaValidator, SqlDialect, TableOrder, check_sql,
        parse_with_report, to_graph,
    };

    #[derive(Parser)]
    #[command(name = "erdsync")]
    #[command(author, version, about = "Translate between SQL DDL, an ER model and a diagram graph")]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Re-generate a DDL file for another dialect
        Convert {
            /// Path to the .sql file
            file: PathBuf,

            /// Target dialect (mysql, postgresql, sqlite, sqlserver); defaults to ERDSYNC_DIALECT
            #[arg(short, long)]
            dialect: Option<SqlDialect>,

            /// Emit `-- Position:` comments
            #[arg(long)]
            positions: bool,

            /// Emit DROP TABLE statements first
            #[arg(long)]
            drops: bool,

            /// Order tables so referenced tables come first
            #[arg(long)]
            dependency_order: bool,
        },
        /// Report syntax diagnostics and schema problems
        Check {
            file: PathBuf,

            #[arg(short, long)]
            dialect: Option<SqlDialect>,
        },
        /// Print the diagram graph as JSON
        Graph { file: PathBuf },
        /// Re-arrange the tables and export with position comments
        Layout {
            file: PathBuf,

            #[arg(short, long)]
            dialect: Option<SqlDialect>,

            /// Force-directed instead of grid
            #[arg(long)]
            force: bool,
        },
    }

    fn load(path: &Path) -> Result<ParseReport> {
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = parse_with_report(&sql)
            .with_context(|| format!("No usable table definitions in {}", path.display()))?;

        for skipped in &report.skipped {
            tracing::warn!("Skipped statement at line {}: {}", skipped.line, skipped.reason);
        }
        for warning in &report.warnings {
            tracing::warn!("{}", warning);
        }
        Ok(report)
    }

    pub fn run() -> Result<()> {
        // Load .env file (if exists)
        let _ = dotenvy::dotenv();

        tracing_subscriber::fmt::init();

        let config = Config::from_env();
        let cli = Cli::parse();

        match cli.command {
            Commands::Convert {
                file,
                dialect,
                positions,
                drops,
                dependency_order,
            } => {
                let schema = load(&file)?.schema;
                let mut options = config.export_options();
                if let Some(dialect) = dialect {
                    options.sql_dialect = dialect;
                }
                options.include_positions |= positions;
                options.include_drop_statements = drops;
                if dependency_order {
                    options.table_order = TableOrder::Dependencies;
                }
                print!("{}", SchemaExporter::export_sql(&schema, &options));
            }
            Commands::Check { file, dialect } => {
                let dialect = dialect.unwrap_or(config.dialect);
                let sql = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;

                let syntax = check_sql(&sql, dialect);
                println!("{}", syntax.format_for_display());

                let report = parse_with_report(&sql)?;
                for skipped in &report.skipped {
                    println!("skipped [L{}]: {}", skipped.line, skipped.reason);
                }
                for warning in &report.warnings {
                    println!("warning: {}", warning);
                }

                let validation = SchemaValidator::for_dialect(dialect).validate(&report.schema);
                for issue in &validation.warnings {
                    println!("warning: {}", issue);
                }
                for issue in &validation.errors {
                    println!("error: {}", issue);
                }
                if !syntax.is_valid || !validation.is_valid() {
                    bail!("{} has problems", file.display());
                }
            }
            Commands::Graph { file } => {
                let schema = load(&file)?.schema;
                println!("{}", serde_json::to_string_pretty(&to_graph(&schema))?);
            }
            Commands::Layout {
                file,
                dialect,
                force,
            } => {
                let mut schema = load(&file)?.schema;
                if force {
                    force_layout(&mut schema);
                } else {
                    grid_layout(&mut schema);
                }
                let mut options = config.export_options();
                options.sql_dialect = dialect.unwrap_or(config.dialect);
                options.include_positions = true;
                print!("{}", SchemaExporter::export_sql(&schema, &options));
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(not(feature = "cli"))]
fn main() {
    // the library has no entry point without the cli feature
}
