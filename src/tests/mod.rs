pub mod factories;

mod channel;
