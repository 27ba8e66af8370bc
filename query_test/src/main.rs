use lod_tree::io::BackingStore;
use lod_tree::stream::{Connection, FetchConfig, StreamCell};

use std::sync::Arc;
use std::time::Instant;

use log::info;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Exported tree directory or base URL of a server
    location: String,

    //Deepest level to stream
    #[arg(short, long, default_value_t = 4)]
    depth: usize,

    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() {

    env_logger::init();

    let args = Args::parse();
    dbg!(&args);

    let store = BackingStore::from_location(&args.location).expect("bad location");
    let config = FetchConfig { workers: args.workers };

    let mut connection = Connection::open(store, &config).expect("could not open tree");

    let start = Instant::now();
    let mut total_points = 0;
    let mut total_cells = 0;

    let mut level: Vec<Arc<StreamCell>> = vec![connection.tree().root()];

    for depth in 0..=args.depth {

        if level.is_empty() {
            break;
        }

        for cell in level.iter() {
            connection.request(cell);
        }

        let mut points = 0;
        let mut next_level: Vec<Arc<StreamCell>> = Vec::new();

        for cell in level.iter() {
            connection.wait_complete(cell).expect("connection closed while streaming");
            points += cell.points().len();
            next_level.extend(connection.tree().children_of(cell));
        }

        info!("depth {}: {} cells, {} points, {:.3}s", depth, level.len(), points, start.elapsed().as_secs_f64());

        total_points += points;
        total_cells += level.len();
        level = next_level;
    }

    connection.close();

    println!("{} cells, {} points in {:.3}s", total_cells, total_points, start.elapsed().as_secs_f64());
}
