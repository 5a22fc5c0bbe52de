fn main() -> miette::Result<()> {
    tanka::cli::run()
}
