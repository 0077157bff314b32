fn main() {
    if let Err(err) = svgscene::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
