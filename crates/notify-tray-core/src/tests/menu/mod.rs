mod popup;
mod template;
