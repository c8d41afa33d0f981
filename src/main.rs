fn main() -> anyhow::Result<()> {
    notes_remote::cli::run()
}
