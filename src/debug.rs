
use std::{cell::RefCell, io::{self, Write}, sync::{Mutex, OnceLock, atomic::{AtomicU8, Ordering}, mpsc::{ channel, Sender, Receiver }}, thread::{self, JoinHandle, ThreadId}, time::{SystemTime, UNIX_EPOCH}};

// TODO
//   Logging:
//     add file support
//     buffer messages in the sink instead of printing each one as it arrives

pub trait MemoryUse {
    fn memory_use_estimate(&self) -> usize;
}

/// Severity filter, messages below the active level are dropped before they reach the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Log = 1,
    Warn = 2,
    Error = 3,
    Off = 4,
}

impl LogLevel {
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "log" | "info" => Some(LogLevel::Log),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> LogLevel {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Log,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self { LogLevel::Log }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Log as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn log_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::SeqCst))
}

#[derive(Debug, Clone)]
pub enum LogMessageContents {
    Log(String),
    Warn(String),
    Error(String),
    Debug(String),
    Close,
}

impl LogMessageContents {
    fn type_string(&self) -> &str {
        match self {
            Self::Log(_) => "log",
            Self::Warn(_) => "warning",
            Self::Error(_) => "error",
            Self::Debug(_) => "debug",
            Self::Close => "close",
        }
    }

    fn level(&self) -> LogLevel {
        match self {
            Self::Debug(_) => LogLevel::Debug,
            Self::Log(_) => LogLevel::Log,
            Self::Warn(_) => LogLevel::Warn,
            Self::Error(_) => LogLevel::Error,
            Self::Close => LogLevel::Off,
        }
    }
}

#[derive(Debug)]
pub struct LogMessage {
    time: SystemTime,
    thread: ThreadId,
    module: &'static str,
    context: Option<&'static str>,
    contents: LogMessageContents,
}

impl LogMessage {
    pub fn new(module: &'static str, contents: LogMessageContents) -> Self {
        LogMessage {
            time: SystemTime::now(),
            thread: thread::current().id(),
            module,
            context: current_context(),
            contents,
        }
    }
}

pub trait LogSink: Send {
    fn handle_message(&self, message: LogMessage);
}

/// The default log sink
///
/// Stateless. Simply prints log messages to standard error as it receives them, standard out is left to
/// the simulation output
struct DefaultLogSink {}

impl DefaultLogSink {
    fn write_message<W: Write>(&self, out: &mut W, message: &LogMessage) -> io::Result<()> {
        let since_epoch = message.time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let time_string = format!("{}.{:06}", since_epoch.as_secs(), since_epoch.subsec_micros());

        let context_string = match message.context {
            Some(context) => format!("{}:{}", message.contents.type_string(), context),
            None => format!("{}:{}", message.contents.type_string(), message.module),
        };

        match &message.contents {
            LogMessageContents::Log(contents) => {
                writeln!(out, "{time} - {cont}", time=time_string, cont=contents)
            },
            LogMessageContents::Debug(contents) => {
                writeln!(out, "{time} [\x1b[0;35m{ctx}\x1b[0m] {thread:?} - {cont}", ctx=context_string, time=time_string, thread=message.thread, cont=contents)
            },
            LogMessageContents::Warn(contents) => {
                writeln!(out, "{time} [\x1b[0;33m{ctx}\x1b[0m] - {cont}", ctx=context_string, time=time_string, cont=contents)
            },
            LogMessageContents::Error(contents) => {
                writeln!(out, "{time} [\x1b[0;31m{ctx}\x1b[0m] - {cont}", ctx=context_string, time=time_string, cont=contents)
            },
            LogMessageContents::Close => {
                // do nothing
                Ok(())
            },
        }
    }
}

impl LogSink for DefaultLogSink {
    fn handle_message(&self, message: LogMessage) {
        // nowhere left to report a failed write to
        let _ = self.write_message(&mut io::stderr(), &message);
    }
}

static LOG_SENDER: OnceLock<Mutex<Sender<LogMessage>>> = OnceLock::new();
static LOG_RECEIVER_JOIN_HANDLE: Mutex<Option<JoinHandle<()>>> = Mutex::new(None);
static LOG_SINK: Mutex<Option<Box<dyn LogSink>>> = Mutex::new(None);

/// Replaces the active sink, returning the previous one if there was one
pub fn set_log_sink(sink: Box<dyn LogSink>) -> Option<Box<dyn LogSink>> {
    match LOG_SINK.lock() {
        Ok(mut current) => current.replace(sink),
        Err(poisoned) => poisoned.into_inner().replace(sink),
    }
}

/// Reciever thread function. There should only ever be one of these running
fn log_reciever_fn(receiver: Receiver<LogMessage>) {
    while let Ok(msg) = receiver.recv() {
        let close = matches!(msg.contents, LogMessageContents::Close);
        sink(msg);
        if close {
            return
        }
    }
}

fn sink(msg: LogMessage) {
    let mut guard = match LOG_SINK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    guard.get_or_insert_with(|| Box::new(DefaultLogSink {}) as Box<dyn LogSink>).handle_message(msg);
}

fn log_channel() -> &'static Mutex<Sender<LogMessage>> {
    LOG_SENDER.get_or_init(|| {
        let (tx, rx) = channel::<LogMessage>();
        let handle = thread::spawn(move || log_reciever_fn(rx));

        if let Ok(mut join_handle) = LOG_RECEIVER_JOIN_HANDLE.lock() {
            *join_handle = Some(handle);
        }
        Mutex::new(tx)
    })
}

/// Sends a message to the sink thread. Messages below the active level are dropped here
pub fn send(msg: LogMessage) {
    if msg.contents.level() < log_level() {
        return
    }

    if let Ok(tx) = log_channel().lock() {
        // the receiver only hangs up after shutdown, later messages are discarded
        let _ = tx.send(msg);
    }
}

/// Flushes every pending message and joins the sink thread
///
/// Anything logged after this returns is discarded
pub fn shutdown_log() {
    if let Ok(tx) = log_channel().lock() {
        let _ = tx.send(LogMessage::new(module_path!(), LogMessageContents::Close));
    }

    let handle = match LOG_RECEIVER_JOIN_HANDLE.lock() {
        Ok(mut handle) => handle.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };

    if let Some(handle) = handle {
        if handle.join().is_err() {
            eprintln!("log sink thread panicked before shutdown");
        }
    }
}

thread_local! {
    static LOG_CONTEXT: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
}

fn current_context() -> Option<&'static str> {
    LOG_CONTEXT.with(|stack| stack.borrow().last().copied())
}

/// Keeps a context label active on this thread until dropped, see `log_context!`
pub struct ContextGuard {
    _private: (),
}

impl ContextGuard {
    pub fn enter(name: &'static str) -> Self {
        LOG_CONTEXT.with(|stack| stack.borrow_mut().push(name));
        ContextGuard { _private: () }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        LOG_CONTEXT.with(|stack| { stack.borrow_mut().pop(); });
    }
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(any(debug_assertions, feature = "debug_log"))]
        {
            $crate::log_send!($crate::debug::LogMessageContents::Debug(format!($($arg)*)));
        }
    }
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::log_send!($crate::debug::LogMessageContents::Log(format!($($arg)*)))
    }
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log_send!($crate::debug::LogMessageContents::Warn(format!($($arg)*)))
    }
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log_send!($crate::debug::LogMessageContents::Error(format!($($arg)*)))
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_send {
    ($contents:expr) => {
        $crate::debug::send($crate::debug::LogMessage::new(module_path!(), $contents))
    };
}

/// Runs the body with `name` as the log context of every message sent from it
#[macro_export]
macro_rules! log_context {
    (($name:expr) {$($body:tt)*}) => {{
        let __guard = $crate::debug::ContextGuard::enter($name);
        let __result = { $($body)* };
        drop(__guard);
        __result
    }};
}
