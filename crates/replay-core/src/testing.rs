//! Scripted in-memory compute service for controller tests.
//!
//! Each endpoint records the requests it receives and answers them in
//! arrival order from a reply queue the test feeds. A call waits until a
//! reply is queued, which lets tests observe the loading state and
//! interleave commands with in-flight fetches. Dropping the reply sender
//! makes every further call fail with a transport error.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use replay_client::{ComputeError, ComputeService};
use replay_types::{
    EvolveRequest, EvolveResponse, SimulatePathsResponse, SimulationParams, SolveBoardRequest,
    SolveBoardResponse,
};
use tokio::sync::mpsc;

type Reply<T> = Result<T, ComputeError>;

pub(crate) struct Script<Req, Resp> {
    requests: std::sync::Mutex<Vec<Req>>,
    replies: tokio::sync::Mutex<mpsc::UnboundedReceiver<Reply<Resp>>>,
}

impl<Req: Clone, Resp> Script<Req, Resp> {
    fn new() -> (Self, mpsc::UnboundedSender<Reply<Resp>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let script = Self {
            requests: std::sync::Mutex::new(Vec::new()),
            replies: tokio::sync::Mutex::new(rx),
        };
        (script, tx)
    }

    async fn call(&self, request: Req) -> Reply<Resp> {
        self.requests.lock().unwrap().push(request);
        let mut replies = self.replies.lock().await;
        replies
            .recv()
            .await
            .unwrap_or_else(|| Err(ComputeError::Transport("script exhausted".to_owned())))
    }

    pub(crate) fn requests(&self) -> Vec<Req> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) struct FakeService {
    pub solve: Script<SolveBoardRequest, SolveBoardResponse>,
    pub simulate: Script<SimulationParams, SimulatePathsResponse>,
    pub evolve: Script<EvolveRequest, EvolveResponse>,
}

pub(crate) struct Replies {
    pub solve: mpsc::UnboundedSender<Reply<SolveBoardResponse>>,
    pub simulate: mpsc::UnboundedSender<Reply<SimulatePathsResponse>>,
    pub evolve: mpsc::UnboundedSender<Reply<EvolveResponse>>,
}

impl FakeService {
    pub(crate) fn new() -> (Arc<Self>, Replies) {
        let (solve, solve_tx) = Script::new();
        let (simulate, simulate_tx) = Script::new();
        let (evolve, evolve_tx) = Script::new();
        let service = Arc::new(Self {
            solve,
            simulate,
            evolve,
        });
        let replies = Replies {
            solve: solve_tx,
            simulate: simulate_tx,
            evolve: evolve_tx,
        };
        (service, replies)
    }
}

impl ComputeService for FakeService {
    async fn solve_board(&self, request: SolveBoardRequest) -> Reply<SolveBoardResponse> {
        self.solve.call(request).await
    }

    async fn simulate_paths(&self, params: SimulationParams) -> Reply<SimulatePathsResponse> {
        self.simulate.call(params).await
    }

    async fn evolve_generation(&self, request: EvolveRequest) -> Reply<EvolveResponse> {
        self.evolve.call(request).await
    }
}
