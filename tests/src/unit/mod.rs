mod session_tests;
mod shell_tests;
mod view_tests;
