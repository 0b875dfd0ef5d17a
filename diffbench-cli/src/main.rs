fn main() {
    if let Err(e) = diffbench_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
