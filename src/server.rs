use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::{cursor, execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::bus::{CommandBus, SessionEvent};
use crate::controller::{Flow, NavigationController};
use crate::db;
use crate::error::AppError;
use crate::keymap::KeyMap;
use crate::term_input::InputParser;
use crate::ui;

const ACCEPT_POLL: Duration = Duration::from_millis(200);
const SESSION_POLL: Duration = Duration::from_millis(250);
// Remote window size is not negotiated; every session gets a fixed frame.
const SESSION_COLS: u16 = 80;
const SESSION_ROWS: u16 = 24;

/// Accepts raw-terminal TCP connections and runs one independent session
/// per peer: fresh controller starting at phone entry, own command bus,
/// shared storage handle. Transport security is left to the deployment.
pub fn run(db_path: &str, listen: &str, keymap: KeyMap, grace: Duration) -> Result<(), AppError> {
    let conn = db::open_connection(db_path)?;
    let store = Arc::new(Mutex::new(conn));

    let listener = TcpListener::bind(listen)?;
    listener.set_nonblocking(true)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|err| AppError::Config(format!("cannot install signal handler: {err}")))?;

    info!(addr = listen, "listening for terminal sessions");
    let mut sessions: Vec<JoinHandle<()>> = Vec::new();
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "session opened");
                let store = Arc::clone(&store);
                let keymap = keymap.clone();
                let shutdown = Arc::clone(&shutdown);
                sessions.push(thread::spawn(move || {
                    if let Err(err) = run_session(&stream, store, keymap, &shutdown) {
                        debug!(%peer, error = %err, "session ended with an error");
                    }
                    let _ = stream.shutdown(Shutdown::Both);
                    info!(%peer, "session closed");
                }));
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(err) => {
                warn!(error = %err, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
        sessions.retain(|session| !session.is_finished());
    }

    drain_sessions(sessions, grace);
    info!("server stopped");
    Ok(())
}

/// Sessions watch the shutdown flag between events, so a bounded wait is
/// enough to let them repaint, close their streams, and exit.
fn drain_sessions(sessions: Vec<JoinHandle<()>>, grace: Duration) {
    if sessions.is_empty() {
        return;
    }
    info!(
        in_flight = sessions.len(),
        grace_secs = grace.as_secs(),
        "draining sessions"
    );
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline && sessions.iter().any(|session| !session.is_finished()) {
        thread::sleep(Duration::from_millis(50));
    }

    let mut abandoned = 0usize;
    for session in sessions {
        if session.is_finished() {
            let _ = session.join();
        } else {
            abandoned += 1;
        }
    }
    if abandoned > 0 {
        warn!(count = abandoned, "sessions still open after grace period");
    }
}

fn run_session(
    stream: &TcpStream,
    store: Arc<Mutex<Connection>>,
    keymap: KeyMap,
    shutdown: &AtomicBool,
) -> Result<(), AppError> {
    let (events_tx, events) = mpsc::channel();

    let reader = stream.try_clone()?;
    let keys_tx = events_tx.clone();
    thread::spawn(move || forward_remote_keys(reader, &keys_tx));

    let bus = CommandBus::start(store, events_tx);
    let mut controller = NavigationController::new(bus, keymap);

    let mut out = std::io::BufWriter::new(stream.try_clone()?);
    execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(stream.try_clone()?),
        TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, SESSION_COLS, SESSION_ROWS)),
        },
    )?;

    let result = session_loop(&mut controller, &events, &mut terminal, shutdown);
    let _ = execute!(out, terminal::LeaveAlternateScreen, cursor::Show);
    result
}

fn session_loop(
    controller: &mut NavigationController,
    events: &mpsc::Receiver<SessionEvent>,
    terminal: &mut Terminal<CrosstermBackend<TcpStream>>,
    shutdown: &AtomicBool,
) -> Result<(), AppError> {
    terminal.draw(|frame| ui::draw(frame, controller.screen(), controller.keymap()))?;
    loop {
        match events.recv_timeout(SESSION_POLL) {
            Ok(session_event) => {
                let flow = controller.dispatch(session_event);
                terminal.draw(|frame| ui::draw(frame, controller.screen(), controller.keymap()))?;
                if flow == Flow::Quit {
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::SeqCst) {
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn forward_remote_keys(mut stream: TcpStream, events: &Sender<SessionEvent>) {
    let mut parser = InputParser::default();
    let mut buffer = [0u8; 1024];
    loop {
        match stream.read(&mut buffer) {
            Ok(0) => break, // peer hung up
            Ok(len) => {
                for key in parser.feed(&buffer[..len]) {
                    if events.send(SessionEvent::Key(key)).is_err() {
                        return;
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    let _ = events.send(SessionEvent::Closed);
}
