//! The acceptor: accepts connections, hands them to the worker pool, and
//! coordinates shutdown.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info};
use mio::{Events, Interest, Poll, Token, Waker};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::http::{handle_connection, ServerContext};
use crate::listener::Listener;
use crate::pool::{termination_signals, ThreadPool};

const LISTEN_TOKEN: Token = Token(usize::MAX);
const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// Ties the listener, the worker pool and the shutdown waker together.
#[derive(Debug)]
pub struct Server {
    listener: Listener,
    pool: ThreadPool,
    poll: Poll,
    waker: Arc<Waker>,
    ctx: Arc<ServerContext>,
}

/// Handle that makes [`Server::run`] return. Cheap to clone; safe to use
/// from any thread, including a signal-watching one.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Wakes the acceptor out of its poll so it can begin shutdown.
    pub fn shutdown(&self) -> io::Result<()> {
        self.waker.wake()
    }
}

impl Server {
    /// Registers the listener with a fresh poll instance.
    pub fn new(mut listener: Listener, pool: ThreadPool, ctx: ServerContext) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(listener.source(), LISTEN_TOKEN, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);

        Ok(Server {
            listener,
            pool,
            poll,
            waker,
            ctx: Arc::new(ctx),
        })
    }

    /// Retrieves a handle that ends the accept loop when invoked.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            waker: Arc::clone(&self.waker),
        }
    }

    /// Runs the accept loop until the shutdown handle fires, then joins the
    /// worker pool. Connections already handed to workers run to completion.
    pub fn run(mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);

        'accepting: loop {
            if let Err(err) = self.poll.poll(&mut events, None) {
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            for event in events.iter() {
                match event.token() {
                    WAKE_TOKEN => break 'accepting,
                    LISTEN_TOKEN => self.accept_ready(),
                    _ => {}
                }
            }
        }

        debug!("Signal received, waiting for workers to finish");
        drop(self.listener);
        self.pool.shutdown();
        Ok(())
    }

    /// Drains the accept queue after a readiness event.
    fn accept_ready(&self) {
        loop {
            match self.listener.accept() {
                Ok(stream) => self.dispatch(stream),
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(err) => {
                    error!("Could not accept a connection: {err}");
                    return;
                }
            }
        }
    }

    /// Wraps an accepted stream into a job and enqueues it.
    fn dispatch(&self, stream: std::net::TcpStream) {
        // Keep termination signals out while the descriptor changes hands;
        // a signal landing mid-enqueue must not strand the connection.
        let mask = termination_signals();
        let _ = mask.thread_block();

        let ctx = Arc::clone(&self.ctx);
        let enqueued = self.pool.execute(move || {
            info!("Incoming connection received");
            handle_connection(stream, &ctx);
            info!("Connection closed");
        });
        if enqueued.is_err() {
            error!("Incoming connection not processed");
        }

        let _ = mask.thread_unblock();
    }
}

/// Watches for SIGINT/SIGTERM on a dedicated thread and trips the shutdown
/// handle on the first one. The thread parks in the kernel, not in a signal
/// handler; all real work happens on ordinary threads.
pub fn spawn_signal_listener(handle: ShutdownHandle) -> io::Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::Builder::new().name("signals".to_owned()).spawn(move || {
        if let Some(signal) = signals.forever().next() {
            debug!("Received signal {signal}, shutting down");
            if let Err(err) = handle.shutdown() {
                error!("Could not wake the acceptor: {err}");
            }
        }
    })
}
