fn main() {
    if let Err(err) = csv_datefix::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
