//! Runs a whole simulated tournament shaped by the fuzzer's bytes. See
//! [`tabmaker::workloads::Workload::from_bytes`].

#![no_main]

use libfuzzer_sys::fuzz_target;
use tabmaker::workloads::Workload;

fuzz_target!(|data: &[u8]| {
    let workload = Workload::from_bytes(data);
    let outcome = workload.run().unwrap();
    assert_eq!(outcome.team_tab.rows.len(), workload.teams);
});
