//! nodewright CLI binary entry point

fn main() -> anyhow::Result<()> {
    nodewright::run()
}
