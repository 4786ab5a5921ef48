mod dispatcher;
mod thread;
