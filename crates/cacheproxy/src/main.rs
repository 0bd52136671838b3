fn main() -> anyhow::Result<()> {
    smol::block_on(cacheproxy::run())
}
