extern crate cc;

trait SetupForPlatform {
    fn setup_for_platform(&mut self, platform: &str) -> &mut Self;
}

impl SetupForPlatform for cc::Build {
    fn setup_for_platform(&mut self, platform: &str) -> &mut Self {
        match platform {
            "x86_64-unknown-linux-gnu"
            | "x86_64-unknown-linux-musl" => {
                self.file("platforms/x86_64-linux/context.s")
            },
            "aarch64-unknown-linux-gnu"
            | "aarch64-unknown-linux-musl" => {
                self.file("platforms/aarch64-linux/context.s")
            },
            _ => panic!("Unsupported platform: {}", platform)
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=platforms");

    cc::Build::new()
        .setup_for_platform(std::env::var("TARGET").unwrap_or_else(|e| {
            panic!("Error while reading the TARGET environment variable: {:?}", e);
        }).as_str())
        .compile("coro_platform");
}
