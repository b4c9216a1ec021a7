fn main() -> anyhow::Result<()> {
    resfile::cli::run_cli()
}
