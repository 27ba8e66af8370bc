//! Shared fixtures for the reading side tests.
use crate::attribute::{Attribute, AttributeType, DataAttributes};
use crate::data::{Point, Value};
use crate::octree::Octree;
use crate::tree::{Tree, TreeConfig};

use std::convert::Infallible;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, StatusCode};
use hyper::server::Server;
use rand::Rng;

pub fn schema() -> DataAttributes {
    DataAttributes::new(vec![
        Attribute::new(0, "X", 0, AttributeType::Float64),
        Attribute::new(1, "Y", 8, AttributeType::Float64),
        Attribute::new(2, "Z", 16, AttributeType::Float64),
        Attribute::new(3, "Intensity", 24, AttributeType::UInt16),
    ]).unwrap()
}

/// A random octree of a few thousand points, exported to `directory`.
pub fn exported_tree(directory: &Path) -> Tree<Octree> {

    let schema = schema();

    let mut config = TreeConfig::default();
    config.split = [2, 2, 2];
    config.directory = directory.to_string_lossy().to_string();

    let octree = Octree::from_config(&config).unwrap();
    let mut tree = Tree::new(schema.clone(), octree, config).unwrap();

    let mut rng = rand::thread_rng();
    for i in 0..2000 {
        let values = [Value::Float(rng.gen()), Value::Float(rng.gen()), Value::Float(rng.gen()), Value::Int(i % 65536)];
        tree.add_point(Point::from_values(&schema, &values).unwrap()).unwrap();
    }

    tree.export(directory).unwrap();

    return tree;
}

async fn get_file(req: Request<Body>, root: Arc<PathBuf>) -> Result<Response<Body>, Infallible> {

    let relative = req.uri().path().trim_start_matches('/').to_string();

    let response = match tokio::fs::read(root.join(relative)).await {
        Ok(data) => Response::new(Body::from(data)),
        Err(_) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    };

    return Ok(response);
}

/// Serves files below `root` over HTTP on a free local port, returns the base URL.
pub fn serve_directory(root: PathBuf) -> String {

    //bound here so the port accepts connections before the URL is handed out
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    thread::spawn(move || {

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        runtime.block_on(async move {

            let root = Arc::new(root);

            let make_svc = make_service_fn(move |_conn| {
                let root = root.clone();
                async move { Ok::<_, Infallible>(service_fn( move |req| {
                    let root = root.clone();
                    get_file(req, root)
                }
                    ))}
            });

            Server::from_tcp(listener).unwrap().serve(make_svc).await.unwrap();
        });
    });

    return format!("http://{}", address);
}
