fn main() {
    if let Err(err) = taskboard_lib::run() {
        eprintln!("taskboard: {err}");
        std::process::exit(1);
    }
}
