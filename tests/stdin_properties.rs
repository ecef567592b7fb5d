#![cfg(unix)]

use proptest::prelude::*;

use procgate::exec::CHUNK_SIZE;
use procgate::{ExecConfig, ExecRequest, Executor};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever bytes go in on stdin come back out of `cat` unchanged, and
    /// `cat` terminating at all shows that stdin was closed.
    #[test]
    fn child_sees_exact_stdin_bytes(input in proptest::collection::vec(any::<u8>(), 0..20_000)) {
        let executor = Executor::new(ExecConfig::default());
        let result = runtime()
            .block_on(executor.execute(ExecRequest::exec(["cat"]).input(input.clone()).binary()))
            .expect("cat should run");

        prop_assert!(result.success);
        prop_assert_eq!(result.stdout_bytes(), &input[..]);
    }

    /// Overshoot past the output limit is bounded by one read chunk.
    #[test]
    fn captured_output_respects_limit(limit in 0usize..50_000) {
        let executor = Executor::new(ExecConfig::default());
        let result = runtime()
            .block_on(executor.execute(
                ExecRequest::exec(["head", "-c", "200000", "/dev/zero"])
                    .binary()
                    .output_limit(limit),
            ))
            .expect("head should run");

        prop_assert!(result.stdout_bytes().len() <= limit + CHUNK_SIZE);
        prop_assert!(!result.success);
    }
}
