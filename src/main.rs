use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use factbook_query::catalog::BuildReport;
use factbook_query::{
    settings, Answer, CatalogBuilder, CountryCatalog, HttpSource, QueryEngine, Question,
};

#[derive(Parser)]
#[command(name = "factbook_query", about = "Country facts from the World Factbook")]
struct Cli {
    /// Settings file (default: ./factbook.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog and report what was gathered
    Build,
    /// List catalog countries
    Countries,
    /// Show every attribute of one country
    Show { country: String },
    /// Countries in a continent prone to a natural hazard
    Q1 { continent: String, hazard: String },
    /// Countries whose flag mentions a symbol
    Q2 { symbol: String },
    /// Least populous country of a continent
    Q3 { continent: String },
    /// Countries of a continent smaller than Pennsylvania
    Q4 { continent: String },
    /// The N oldest international organizations
    Q5 { count: usize },
    /// Countries whose dominant religion is above / below two percentages
    Q6 { above: u64, below: u64 },
    /// Landlocked countries with a single neighbor
    Q7,
    /// Countries of a continent with a climate and over 2,500 km of coast
    Q8 { continent: String, climate: String },
    /// Numbered question prompt
    Interactive,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = settings::load(cli.config.as_deref())?;
    let source = HttpSource::new(&settings).context("Failed to create HTTP client")?;

    let t0 = Instant::now();
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    let (catalog, report) = CatalogBuilder::new(&source, &settings)
        .with_progress(pb)
        .build();
    if !report.is_complete() {
        eprintln!(
            "Catalog is partial: {} of {} build steps skipped (see `build`).",
            report.skipped.len(),
            settings.sections.len() + 3
        );
    }

    let engine = QueryEngine::new(&catalog);
    let question = match cli.command {
        Commands::Build => {
            print_report(&report, t0, cli.json)?;
            return Ok(());
        }
        Commands::Countries => {
            let names: Vec<&str> = catalog.countries().map(|(name, _)| name).collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
            return Ok(());
        }
        Commands::Show { country } => {
            show_country(&catalog, &country, cli.json)?;
            return Ok(());
        }
        Commands::Interactive => return interactive(&engine),
        Commands::Q1 { continent, hazard } => Question::Hazard { continent, hazard },
        Commands::Q2 { symbol } => Question::FlagSymbol { symbol },
        Commands::Q3 { continent } => Question::LeastPopulous { continent },
        Commands::Q4 { continent } => Question::SmallerThanPennsylvania { continent },
        Commands::Q5 { count } => Question::OldestOrganizations { count },
        Commands::Q6 { above, below } => Question::DominantReligion { above, below },
        Commands::Q7 => Question::LandlockedBySingleNeighbor,
        Commands::Q8 { continent, climate } => Question::CoastalClimate { continent, climate },
    };

    let answer = engine.answer(&question);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&question, &answer);
    }
    Ok(())
}

fn print_report(report: &BuildReport, t0: Instant, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("Countries:     {}", report.countries);
    println!("Organizations: {}", report.organizations);
    for p in &report.populated {
        println!("  {:<16} {:>4} rows", p.attribute.as_str(), p.rows);
    }
    if !report.excluded.is_empty() {
        println!("Excluded:      {}", report.excluded.join(", "));
    }
    for s in &report.skipped {
        println!("  skipped {}: {}", s.step, s.reason);
    }
    println!("\nBuilt in {:.1}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn show_country(catalog: &CountryCatalog, country: &str, json: bool) -> Result<()> {
    let Some(attrs) = catalog.get(country) else {
        println!("No country named {:?}.", country);
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(attrs)?);
    } else {
        for (attr, value) in attrs {
            println!("{:<16} {}", attr.as_str(), value);
        }
    }
    Ok(())
}

fn print_answer(question: &Question, answer: &Answer) {
    match (question, answer) {
        (Question::DominantReligion { above, below }, Answer::Split(split)) => {
            println!("Dominant religion above {}%: {}", above, list(&split.above));
            println!("Dominant religion below {}%: {}", below, list(&split.below));
        }
        (_, Answer::Name(name)) if name.is_empty() => println!("No match."),
        (_, Answer::Name(name)) => println!("{}", name),
        (_, Answer::Names(names)) => println!("{}", list(names)),
        (_, Answer::Split(_)) => {}
    }
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

// ── Interactive prompt ──

fn interactive(engine: &QueryEngine<'_>) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |prompt: &str| -> Result<Option<String>> {
        print!("{} ", prompt);
        io::stdout().flush()?;
        Ok(lines.next().transpose()?.map(|l| l.trim().to_string()))
    };

    println!("Questions 1-8, `q` to quit.");
    loop {
        let Some(choice) = ask("Question (1-8):")? else {
            return Ok(());
        };
        let question = match choice.as_str() {
            "q" | "quit" | "exit" => return Ok(()),
            "1" => {
                let Some(continent) = ask("Continent:")? else { return Ok(()) };
                let Some(hazard) = ask("Natural hazard:")? else { return Ok(()) };
                Question::Hazard { continent, hazard }
            }
            "2" => {
                let Some(symbol) = ask("Flag symbol:")? else { return Ok(()) };
                Question::FlagSymbol { symbol }
            }
            "3" => {
                let Some(continent) = ask("Continent:")? else { return Ok(()) };
                Question::LeastPopulous { continent }
            }
            "4" => {
                let Some(continent) = ask("Continent:")? else { return Ok(()) };
                Question::SmallerThanPennsylvania { continent }
            }
            "5" => {
                let Some(raw) = ask("Number of organizations:")? else { return Ok(()) };
                match raw.parse() {
                    Ok(count) => Question::OldestOrganizations { count },
                    Err(_) => {
                        println!("Not a number: {}", raw);
                        continue;
                    }
                }
            }
            "6" => {
                let Some(raw_above) = ask("Dominant religion above (%):")? else { return Ok(()) };
                let Some(raw_below) = ask("Dominant religion below (%):")? else { return Ok(()) };
                match (raw_above.parse(), raw_below.parse()) {
                    (Ok(above), Ok(below)) => Question::DominantReligion { above, below },
                    _ => {
                        println!("Percentages must be whole numbers.");
                        continue;
                    }
                }
            }
            "7" => Question::LandlockedBySingleNeighbor,
            "8" => {
                let Some(continent) = ask("Continent:")? else { return Ok(()) };
                let Some(climate) = ask("Climate:")? else { return Ok(()) };
                Question::CoastalClimate { continent, climate }
            }
            _ => {
                println!("Please enter a number between 1 and 8.");
                continue;
            }
        };
        print_answer(&question, &engine.answer(&question));
    }
}
