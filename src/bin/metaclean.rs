use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    metaclean::cli::run(std::env::args().skip(1))
}
