pub fn run() -> anyhow::Result<()> {
    println!("condense {}", env!("CARGO_PKG_VERSION"));
    println!("Conversational context compression engine");
    Ok(())
}
