use lod_tree::attribute::DataAttributes;
use lod_tree::tree::{self, AnyTree};

use kdam::tqdm;
use glob::glob;
use log::{info, warn};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Glob matching the raw input files, each a run of fixed-stride point records
    #[arg(short, long)]
    input: String,

    //attributes.csv describing the records
    #[arg(short, long)]
    schema: String,

    //Output dirname of the tree
    #[arg(short, long)]
    output_dirname: String,

    //Tree config yaml, defaults when not given
    #[arg(short, long)]
    config: Option<String>,

    //Replace the output directory if it already exists
    #[arg(short, long)]
    force: bool,
}

fn main() {

    env_logger::init();

    let args = Args::parse();
    dbg!(&args);

    let mut config = match &args.config {
        Some(filename) => tree::TreeConfig::from_file(filename).expect("TreeConfig file can't be found or read"),
        None => tree::TreeConfig::default(),
    };
    config.directory = args.output_dirname.clone();

    let output = Path::new(&args.output_dirname);
    match (output.is_dir(), args.force) {
        (true, true) => fs::remove_dir_all(output).expect("could not remove existing output directory"),
        (true, false) => panic!("Directory already exists: {}", args.output_dirname),
        (false, _) => {},
    }

    let schema = DataAttributes::from_file(&args.schema).expect("could not read schema");
    let stride = schema.stride();
    info!("schema: {} ({} bytes per point)", schema.names(), stride);

    let mut tree = AnyTree::from_config(config, schema).expect("could not create tree");

    let mut filenames: Vec<String> = Vec::new();
    for entry in glob(&args.input).expect("Glob failed") {
        match entry {
            Ok(path) => filenames.push(path.to_string_lossy().to_string()),
            Err(e) => warn!("skipping input: {}", e),
        }
    }

    let mut skipped: usize = 0;

    for filename in filenames.iter() {

        let length = fs::metadata(filename).expect("could not stat input file").len() as usize;
        let num_records = length / stride;

        if length % stride != 0 {
            warn!("{} has {} trailing bytes, ignoring them", filename, length % stride);
        }

        info!("reading {} records from {}", num_records, filename);

        let mut reader = BufReader::new(File::open(filename).expect("could not open input file"));
        let mut record = vec![0u8; stride];

        for _ in tqdm!(0..num_records) {

            reader.read_exact(&mut record).expect("input file shrank while reading");

            match tree.add_record(&record) {
                Ok(_) => {},
                Err(e) => {
                    warn!("skipping record: {}", e);
                    skipped += 1;
                }
            }
        }
    }

    info!("added {} points, skipped {}", tree.len(), skipped);

    tree.export(&args.output_dirname).expect("could not export tree");

    println!("{}", tree.stats());
}
