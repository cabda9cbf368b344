fn main() -> anyhow::Result<()> {
    shiftwatch_lib::run()
}
