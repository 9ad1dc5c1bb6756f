fn main() -> anyhow::Result<()> {
    pynta_fixtures::run(true)
}
