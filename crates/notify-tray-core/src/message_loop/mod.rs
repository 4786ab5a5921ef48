pub(crate) mod dispatcher;
pub(crate) mod messages;
mod thread;
pub(crate) mod window;

pub use thread::LoopPhase;

pub(crate) use {
    dispatcher::Dispatcher,
    thread::MessageLoopThread,
};
