use lod_tree::attribute::DataAttributes;
use lod_tree::layout;
use lod_tree::tree;

use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use hyper::server::Server;
use log::{debug, info};

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Exported tree directory to serve
    directory: String,

    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

/// File below `root` for a request path, `None` for anything that would leave `root`.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {

    let relative = Path::new(uri_path.trim_start_matches('/'));

    let mut path = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(x) => path.push(x),
            _ => return None,
        }
    }

    match path == root {
        true => None,
        false => Some(path),
    }
}

fn respond(status: StatusCode, body: Body) -> Response<Body> {

    let mut response = Response::new(body);
    *response.status_mut() = status;

    return response;
}

async fn get_file(req: Request<Body>, root: Arc<PathBuf>) -> Result<Response<Body>, Infallible> {

    if req.method() != Method::GET {
        return Ok(respond(StatusCode::METHOD_NOT_ALLOWED, Body::empty()));
    }

    let path = match resolve(&root, req.uri().path()) {
        Some(x) => x,
        None => return Ok(respond(StatusCode::NOT_FOUND, Body::empty())),
    };

    debug!("GET {}", path.display());

    let response = match tokio::fs::read(&path).await {
        Ok(data) => Response::new(Body::from(data)),
        Err(_) => respond(StatusCode::NOT_FOUND, Body::empty()),
    };

    return Ok(response);
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {

    env_logger::init();

    let args = Args::parse();
    let root = PathBuf::from(&args.directory);

    //refuse to serve something that is not an export
    let config = tree::TreeConfig::from_file(root.join(layout::CONFIG_FILENAME))?;
    let schema = DataAttributes::from_file(root.join(layout::ATTRIBUTES_FILENAME))?;
    info!("serving {:?} tree of {:?} points, attributes {}", config.subdivision, config.num_points, schema.names());

    let root = Arc::new(root);

    let make_svc = make_service_fn(move |_conn| {
        let root = root.clone();
        async move { Ok::<_, Infallible>(service_fn( move |req| {
            let root = root.clone();
            get_file(req, root)
        }
            ))}
    });

    let addr = ([127, 0, 0, 1], args.port).into();

    let server = Server::bind(&addr).serve(make_svc);

    println!("Listening on http://{}", addr);

    server.await?;

    Ok(())
}
