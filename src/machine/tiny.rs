use super::{Machine, MachineState, StepResult};

/// Line-oriented toy CPU with a single accumulator.
///
/// Instructions, one per line and case-insensitive:
/// `LOAD n`, `ADD n`, `JMP n`, `HALT`, `NOP`. Blank lines and `;` comments
/// execute as no-ops so that the program counter always equals the zero
/// based source line.
#[derive(Debug, Clone)]
pub struct TinyCpu {
    program: Box<[String]>,
    pc: usize,
    acc: i64,
    halted: bool,
}

enum Instr {
    Skip,
    Halt,
    Load(Option<i64>),
    Add(Option<i64>),
    Jmp(Option<i64>),
    Unknown,
}

impl TinyCpu {
    pub fn new<S: AsRef<str>>(program: &[S]) -> Self {
        let mut cpu = Self {
            program: program.iter().map(|l| l.as_ref().to_string()).collect(),
            pc: 0,
            acc: 0,
            halted: false,
        };
        cpu.reset();
        cpu
    }

    pub fn program(&self) -> &[String] {
        &self.program
    }

    pub fn acc(&self) -> i64 {
        self.acc
    }

    fn finish(&mut self) -> StepResult {
        if self.pc >= self.program.len() {
            self.halted = true;
        }
        self.snapshot()
    }
}

impl Machine for TinyCpu {
    fn reset(&mut self) {
        self.pc = 0;
        self.acc = 0;
        // An empty program is finished before it starts.
        self.halted = self.program.is_empty();
    }

    fn step(&mut self) -> StepResult {
        let Some(line) = self.program.get(self.pc).filter(|_| !self.halted) else {
            self.halted = true;
            return self.snapshot();
        };

        match decode(line) {
            Instr::Halt => {
                self.halted = true;
                return self.snapshot();
            }
            Instr::Load(Some(n)) => self.acc = n,
            Instr::Add(Some(n)) => self.acc = self.acc.wrapping_add(n),
            Instr::Jmp(Some(target)) => {
                if let Ok(target) = usize::try_from(target) {
                    if target < self.program.len() {
                        self.pc = target;
                        return self.snapshot();
                    }
                }
            }
            Instr::Skip
            | Instr::Load(None)
            | Instr::Add(None)
            | Instr::Jmp(None)
            | Instr::Unknown => {}
        }

        self.pc += 1;
        self.finish()
    }

    fn pc(&self) -> usize {
        self.pc
    }

    fn state(&self) -> MachineState {
        MachineState::Accumulator(self.acc)
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}

fn decode(line: &str) -> Instr {
    let upper = line.trim().to_uppercase();
    if upper.is_empty() || upper.starts_with(';') || upper == "NOP" {
        return Instr::Skip;
    }
    if upper == "HALT" {
        return Instr::Halt;
    }
    if let Some(rest) = upper.strip_prefix("LOAD ") {
        return Instr::Load(parse_number(rest));
    }
    if let Some(rest) = upper.strip_prefix("ADD ") {
        return Instr::Add(parse_number(rest));
    }
    if let Some(rest) = upper.strip_prefix("JMP ") {
        return Instr::Jmp(parse_number(rest));
    }
    Instr::Unknown
}

/// Leading signed decimal integer, ignoring anything after the digits.
fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Static check of a toy program, one message per offending line.
///
/// Purely advisory: stepping never consults it.
pub fn validate_program<S: AsRef<str>>(program: &[S]) -> Vec<String> {
    let mut errors = Vec::new();
    let len = program.len() as i64;

    for (idx, line) in program.iter().enumerate() {
        let line_no = idx + 1;
        match decode(line.as_ref()) {
            Instr::Skip | Instr::Halt | Instr::Load(Some(_)) | Instr::Add(Some(_)) => {}
            Instr::Load(None) => {
                errors.push(format!("Line {line_no}: LOAD requires a numeric operand"));
            }
            Instr::Add(None) => {
                errors.push(format!("Line {line_no}: ADD requires a numeric operand"));
            }
            Instr::Jmp(None) => {
                errors.push(format!("Line {line_no}: JMP requires a numeric operand"));
            }
            Instr::Jmp(Some(target)) => {
                if target < 0 || target >= len {
                    errors.push(format!(
                        "Line {line_no}: JMP target {target} is out of range (0-{})",
                        len - 1
                    ));
                }
            }
            Instr::Unknown => {
                errors.push(format!(
                    "Line {line_no}: Unknown instruction \"{}\"",
                    line.as_ref().trim()
                ));
            }
        }
    }

    errors
}
