use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tree_generator::boundaries::LocalityBoundaries;
use tree_generator::dataset::DatasetBuilder;
use tree_generator::reference::{ReferenceCatalog, SpeciesTable};

#[derive(Parser, Debug)]
#[command(name = "tree_generator")]
#[command(about = "Generate a synthetic urban tree dataset for Bogotá")]
struct Args {
    /// Number of tree records to generate
    #[arg(short = 'n', long, default_value = "2000")]
    count: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "data/arboles_bogota.csv")]
    output: PathBuf,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Species range table (semicolon-delimited); the embedded table is
    /// used if not specified
    #[arg(long)]
    species_file: Option<PathBuf>,

    /// Locality boundary GeoJSON
    #[arg(long, default_value = "data/localidades_bogota.geojson")]
    boundaries: PathBuf,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    println!("Generating {} tree records with seed: {}", args.count, seed);

    let catalog = match &args.species_file {
        Some(path) => {
            let table = SpeciesTable::from_file(path)?;
            println!("Loaded {} species from {}", table.len(), path.display());
            ReferenceCatalog::with_species(table)
        }
        None => {
            let catalog = ReferenceCatalog::builtin();
            println!("Using embedded species table ({} species)", catalog.species().len());
            catalog
        }
    };

    let boundaries = LocalityBoundaries::from_geojson_file(&args.boundaries)?;
    println!(
        "Loaded {} locality boundaries from {}",
        boundaries.len(),
        args.boundaries.display()
    );

    let mut builder = DatasetBuilder::new(&catalog, &boundaries);
    let dataset = builder.build(args.count, &mut rng)?;

    if let Some(dir) = args.output.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    dataset.write_csv_file(&args.output)?;

    println!("Wrote {} records to {}", dataset.len(), args.output.display());
    Ok(())
}
