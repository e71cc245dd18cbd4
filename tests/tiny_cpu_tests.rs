// tests/tiny_cpu_tests.rs
// Toy ISA interpreter and validator

use tinycpu_debugger::debugger::{run_until_stop, Breakpoints, StopReason};
use tinycpu_debugger::machine::{validate_program, Machine, MachineState, TinyCpu};

#[cfg(test)]
mod tiny_cpu_tests {
    use super::*;

    fn acc(cpu: &TinyCpu) -> i64 {
        match cpu.state() {
            MachineState::Accumulator(acc) => acc,
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_load_add_halt() {
        let mut cpu = TinyCpu::new(&["LOAD 10", "ADD 5", "HALT"]);

        let result = cpu.step();
        assert!(!result.halted);
        assert_eq!(acc(&cpu), 10);
        assert_eq!(cpu.pc(), 1);

        let result = cpu.step();
        assert!(!result.halted);
        assert_eq!(result.state, MachineState::Accumulator(15));
        assert_eq!(cpu.pc(), 2);

        let result = cpu.step();
        assert!(result.halted);
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc(), 2, "HALT does not advance the pc");
    }

    #[test]
    fn test_comments_and_blanks_advance() {
        let mut cpu = TinyCpu::new(&["; comment", "", "LOAD 2", "ADD 3"]);

        let result = cpu.step();
        assert!(!result.halted);
        assert_eq!((cpu.pc(), acc(&cpu)), (1, 0));

        let result = cpu.step();
        assert!(!result.halted);
        assert_eq!((cpu.pc(), acc(&cpu)), (2, 0));

        let result = cpu.step();
        assert!(!result.halted);
        assert_eq!((cpu.pc(), acc(&cpu)), (3, 2));
    }

    #[test]
    fn test_runs_off_the_end() {
        let mut cpu = TinyCpu::new(&["LOAD 1"]);

        let result = cpu.step();
        assert!(result.halted);
        assert_eq!(cpu.pc(), 1);
        assert_eq!(acc(&cpu), 1);
    }

    #[test]
    fn test_program_length_steps_reach_halt() {
        let program = ["nop", "LOAD 4", "", "; note", "add -1", "Nop"];
        let mut cpu = TinyCpu::new(&program);

        for i in 0..program.len() {
            let result = cpu.step();
            assert_eq!(result.halted, i == program.len() - 1);
        }
        assert_eq!(cpu.pc(), program.len());
        assert_eq!(acc(&cpu), 3);
    }

    #[test]
    fn test_step_when_halted_is_noop() {
        let mut cpu = TinyCpu::new(&["HALT", "LOAD 9"]);
        cpu.step();
        let again = cpu.step();
        assert!(again.halted);
        assert_eq!(again.pc, 0);
        assert_eq!(again.state, MachineState::Accumulator(0));
    }

    #[test]
    fn test_empty_program_halts() {
        let mut cpu = TinyCpu::new::<&str>(&[]);
        assert!(cpu.is_halted(), "nothing to execute");
        assert!(cpu.snapshot().halted);

        let result = cpu.step();
        assert!(result.halted);
        assert_eq!(result.pc, 0);

        cpu.reset();
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jump_taken_and_out_of_range() {
        let mut cpu = TinyCpu::new(&["JMP 2", "LOAD 100", "ADD 1", "JMP 7"]);

        let result = cpu.step();
        assert_eq!(result.pc, 2, "taken jump lands exactly on target");
        assert_eq!(acc(&cpu), 0);

        cpu.step();
        assert_eq!(acc(&cpu), 1);

        // Out-of-range target falls through and runs off the end
        let result = cpu.step();
        assert!(result.halted);
        assert_eq!(result.pc, 4);
    }

    #[test]
    fn test_bad_operands_are_ignored() {
        let mut cpu = TinyCpu::new(&["LOAD 5", "ADD x", "BOGUS", "load 7abc"]);
        cpu.step();
        cpu.step();
        assert_eq!(acc(&cpu), 5);
        cpu.step();
        assert_eq!(acc(&cpu), 5);
        let result = cpu.step();
        assert!(result.halted);
        assert_eq!(acc(&cpu), 7, "lenient integer prefix");
    }

    #[test]
    fn test_reset() {
        let mut cpu = TinyCpu::new(&["LOAD 3", "HALT"]);
        cpu.step();
        cpu.step();
        assert!(cpu.is_halted());

        cpu.reset();
        assert!(!cpu.is_halted());
        assert_eq!(cpu.pc(), 0);
        assert_eq!(acc(&cpu), 0);
    }

    #[test]
    fn test_run_stops_on_breakpoint() {
        let mut cpu = TinyCpu::new(&["LOAD 1", "ADD 2", "ADD 3"]);
        let breakpoints: Breakpoints = [1].into_iter().collect();

        let run = run_until_stop(&mut cpu, &breakpoints, None);
        assert_eq!(run.reason, StopReason::Breakpoint);
        assert_eq!(cpu.pc(), 1);
        assert_eq!(acc(&cpu), 1);

        let next = cpu.step();
        assert!(!next.halted);
        assert_eq!(cpu.pc(), 2);
        assert_eq!(acc(&cpu), 3);
    }

    #[test]
    fn test_run_to_halt_without_breakpoints() {
        let mut cpu = TinyCpu::new(&["LOAD 1", "ADD 2", "ADD 3"]);
        let run = run_until_stop(&mut cpu, &Breakpoints::new(), None);
        assert_eq!(run.reason, StopReason::Halt);
        assert!(run.result.halted);
        assert_eq!(run.result.state, MachineState::Accumulator(6));
    }

    #[test]
    fn test_validator_reports_each_line() {
        let errors = validate_program(&["LOAD foo", "JMP -1", "XYZ"]);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("Line 1"));
        assert!(errors[1].contains("Line 2"));
        assert!(errors[2].contains("Line 3"));
    }

    #[test]
    fn test_validator_accepts_valid_program() {
        let errors = validate_program(&["; start", "", "LOAD 1", "ADD 2", "JMP 0", "NOP", "HALT"]);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_validator_jump_range() {
        let errors = validate_program(&["JMP 3", "JMP 2", "ADD"]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Line 1: JMP target 3 is out of range (0-2)");
        assert_eq!(errors[1], "Line 3: Unknown instruction \"ADD\"");
    }
}
