fn main() {
    #[cfg(feature = "cli")]
    fossil_delta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("fossil-delta: built without the `cli` feature.");
        std::process::exit(1);
    }
}
