mod discovery;
mod loading;
mod validation;
