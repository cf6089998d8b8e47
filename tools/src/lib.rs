pub mod parallel_handler;
