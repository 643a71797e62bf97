use nix::unistd::geteuid;

/// Platform identifier in the form `ARCH-Os`, e.g. `x86_64-Linux`.
pub fn platform() -> String {
    let os = std::env::consts::OS;
    let mut chars = os.chars();
    let os = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{}-{os}", std::env::consts::ARCH)
}

/// Whether the process runs with an effective uid of 0.
pub fn is_root() -> bool {
    geteuid().is_root()
}
