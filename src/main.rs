//! Default binary - shows help text.

fn main() {
    println!("snmpsim {} - SNMP agent simulator", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Available commands:");
    println!("  snmpsim-responder  Run the simulator daemon");
    println!("  snmpsim-validate   Build/validate record-file indexes without serving");
    println!();
    println!("For more information, run any command with --help");
}
