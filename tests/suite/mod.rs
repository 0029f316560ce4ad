mod cli;
mod client;
mod runner;
