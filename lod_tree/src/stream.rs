//! Streams cells of an exported tree on demand.
//!
//! A cell goes from `Empty` to `Pending` when it is requested and from `Pending` to `Complete`
//! once a worker has read it, and never back. Every worker owns a queue and a condition
//! variable; requests are dealt to the workers round robin, and a woken worker takes its whole
//! queue in one go. Reading never blocks the caller unless it asks to wait for a cell.
use crate::attribute::DataAttributes;
use crate::data::{Parser, Point};
use crate::error::{Error, Result};
use crate::io::BackingStore;

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::thread::JoinHandle;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Pending,
    Complete,
}

#[derive(Debug)]
struct CellContents {
    state: CellState,
    points: Arc<Vec<Point>>,
    children: Vec<String>,
    loads: usize,
}

/// A cell on the reading side. Shared between the callers and the workers.
#[derive(Debug)]
pub struct StreamCell {
    path: String,
    contents: Mutex<CellContents>,
    complete: Condvar,
}

impl StreamCell {

    fn new(path: &str) -> Self {
        return Self {
            path: path.to_string(),
            contents: Mutex::new(CellContents {
                state: CellState::Empty,
                points: Arc::new(Vec::new()),
                children: Vec::new(),
                loads: 0,
            }),
            complete: Condvar::new(),
        };
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> CellState {
        lock(&self.contents).state
    }

    /// Moves an empty cell to pending. False if someone got there first.
    fn try_mark_pending(&self) -> bool {

        let mut contents = lock(&self.contents);

        match contents.state {
            CellState::Empty => {
                contents.state = CellState::Pending;
                true
            },
            _ => false,
        }
    }

    /// Fills the cell and marks it complete. An undecodable payload leaves the cell without points.
    fn populate(&self, schema: &DataAttributes, payload: &[u8], children: Vec<String>) {

        let points = match Parser::points(schema, payload) {
            Ok(x) => x,
            Err(e) => {
                warn!("dropping payload of cell `{}`: {}", self.path, e);
                Vec::new()
            }
        };

        {
            let mut contents = lock(&self.contents);
            contents.points = Arc::new(points);
            contents.children = children;
            contents.loads += 1;
            contents.state = CellState::Complete;
        }

        self.complete.notify_all();
    }

    pub fn wait_complete(&self) {

        let mut contents = lock(&self.contents);

        while contents.state != CellState::Complete {
            contents = self.complete.wait(contents).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Points of a complete cell, empty before that.
    pub fn points(&self) -> Arc<Vec<Point>> {
        Arc::clone(&lock(&self.contents).points)
    }

    pub fn children(&self) -> Vec<String> {
        lock(&self.contents).children.clone()
    }

    /// How many times a worker has filled this cell.
    pub fn load_count(&self) -> usize {
        lock(&self.contents).loads
    }
}

/// Path keyed registry of the cells seen so far.
#[derive(Debug)]
pub struct StreamTree {
    schema: Arc<DataAttributes>,
    cells: Mutex<HashMap<String, Arc<StreamCell>>>,
}

impl StreamTree {

    pub fn new(schema: DataAttributes) -> Self {
        return Self {
            schema: Arc::new(schema),
            cells: Mutex::new(HashMap::new()),
        };
    }

    pub fn schema(&self) -> &DataAttributes {
        &self.schema
    }

    pub fn len(&self) -> usize {
        lock(&self.cells).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.cells).is_empty()
    }

    pub fn cell(&self, path: &str) -> Option<Arc<StreamCell>> {
        lock(&self.cells).get(path).cloned()
    }

    /// Cell at `path`, created empty if it was never seen.
    pub fn get_cell(&self, path: &str) -> Arc<StreamCell> {

        let mut cells = lock(&self.cells);

        let cell = cells.entry(path.to_string()).or_insert_with(|| Arc::new(StreamCell::new(path)));

        return Arc::clone(cell);
    }

    pub fn root(&self) -> Arc<StreamCell> {
        self.get_cell("")
    }

    /// Children listed by a complete cell.
    pub fn children_of(&self, cell: &StreamCell) -> Vec<Arc<StreamCell>> {
        cell.children().iter().map(|x| self.get_cell(x)).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub workers: Option<usize>,
}

impl FetchConfig {

    pub fn default() -> Self {
        return Self {
            workers: None,
        };
    }

    /// Configured worker count, or two less than the available cores (at least one).
    pub fn num_workers(&self) -> usize {

        match self.workers {
            Some(n) => n.max(1),
            None => {
                let cores = thread::available_parallelism().map(|x| x.get()).unwrap_or(1);
                cores.saturating_sub(2).max(1)
            }
        }
    }
}

struct WorkerQueue {
    cells: Mutex<VecDeque<Arc<StreamCell>>>,
    ready: Condvar,
}

fn work(id: usize, queue: Arc<WorkerQueue>, running: Arc<AtomicBool>, store: Arc<BackingStore>, schema: Arc<DataAttributes>) {

    loop {

        let batch = {
            let mut cells = lock(&queue.cells);

            while cells.is_empty() && running.load(Ordering::SeqCst) {
                cells = queue.ready.wait(cells).unwrap_or_else(|e| e.into_inner());
            }

            //stopped, and nothing left that was requested before the stop
            if cells.is_empty() {
                debug!("fetch worker {} stopping", id);
                return;
            }

            mem::take(&mut *cells)
        };

        debug!("fetch worker {} took {} cells", id, batch.len());

        for cell in batch {
            let (payload, children) = store.fetch(cell.path());
            cell.populate(&schema, &payload, children);
        }
    }
}

/// A pool of fetch workers reading from one backing store into one `StreamTree`.
pub struct Connection {
    tree: Arc<StreamTree>,
    queues: Vec<Arc<WorkerQueue>>,
    next: Mutex<usize>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Connection {

    /// Reads the schema from the store's `attributes.csv` and starts the workers.
    pub fn open(store: BackingStore, config: &FetchConfig) -> Result<Self> {

        let schema = store.read_attributes()?;

        return Self::with_schema(store, schema, config);
    }

    pub fn with_schema(store: BackingStore, schema: DataAttributes, config: &FetchConfig) -> Result<Self> {

        let tree = Arc::new(StreamTree::new(schema));
        let store = Arc::new(store);
        let running = Arc::new(AtomicBool::new(true));

        let num_workers = config.num_workers();
        let mut queues: Vec<Arc<WorkerQueue>> = Vec::with_capacity(num_workers);
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(num_workers);

        for id in 0..num_workers {

            let queue = Arc::new(WorkerQueue {
                cells: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
            });

            let worker_queue = Arc::clone(&queue);
            let worker_running = Arc::clone(&running);
            let worker_store = Arc::clone(&store);
            let worker_schema = Arc::clone(&tree.schema);

            let handle = thread::Builder::new()
                .name(format!("fetch-{}", id))
                .spawn(move || work(id, worker_queue, worker_running, worker_store, worker_schema))?;

            queues.push(queue);
            workers.push(handle);
        }

        info!("opened connection with {} fetch workers", num_workers);

        return Ok(Self {
            tree,
            queues,
            next: Mutex::new(0),
            running,
            workers,
        });
    }

    pub fn tree(&self) -> &Arc<StreamTree> {
        &self.tree
    }

    pub fn num_workers(&self) -> usize {
        self.queues.len()
    }

    /// Queues an empty cell for loading. Does nothing for pending or complete cells, and after
    /// `close`.
    pub fn request(&self, cell: &Arc<StreamCell>) {

        //held across the running check so close cannot strand a queued cell
        let mut next = lock(&self.next);

        if !self.running.load(Ordering::SeqCst) {
            warn!("connection closed, ignoring request for cell `{}`", cell.path());
            return;
        }

        if !cell.try_mark_pending() {
            return;
        }

        let queue = &self.queues[*next];
        *next = (*next + 1) % self.queues.len();

        lock(&queue.cells).push_back(Arc::clone(cell));
        queue.ready.notify_one();
    }

    pub fn request_path(&self, path: &str) -> Arc<StreamCell> {

        let cell = self.tree.get_cell(path);
        self.request(&cell);

        return cell;
    }

    /// Requests the cell if needed and blocks until it is complete.
    pub fn wait_complete(&self, cell: &Arc<StreamCell>) -> Result<()> {

        self.request(cell);

        if cell.state() == CellState::Empty {
            return Err(Error::InvalidOperation(format!("cell `{}` can not be loaded after close", cell.path())));
        }

        cell.wait_complete();

        return Ok(());
    }

    /// Stops the workers once their queues are drained and joins them.
    pub fn close(&mut self) {

        {
            let _next = lock(&self.next);
            self.running.store(false, Ordering::SeqCst);
        }

        for queue in self.queues.iter() {
            let _cells = lock(&queue.cells);
            queue.ready.notify_all();
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("fetch worker panicked");
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
