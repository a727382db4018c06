use std::{
    fmt::Write as _,
    sync::Arc,
    time::{Duration, Instant},
};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use chip8_vm::{
    chip8::{DISPLAY_X, DISPLAY_Y, Halt, MachineState, Scheduler, column_bit},
    debugger::{Cli, Command, CommandResult, Executor},
};

use crate::MachineArgs;

const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

struct App {
    executor: Executor,
    input: String,
    output: String,
    should_quit: bool,
    last_command: Option<Command>,
    key_press_times: [Option<Instant>; 16],
    /// State captured once per frame for rendering.
    state: MachineState,
}

impl App {
    fn new(args: &MachineArgs) -> anyhow::Result<Self> {
        let beep = || log::info!("Beep");
        let machine = args.build(Arc::new(beep))?;
        let executor = Executor::new(Scheduler::new(machine));

        Ok(Self {
            state: executor.snapshot(),
            executor,
            input: String::new(),
            output: String::new(),
            should_quit: false,
            last_command: None,
            key_press_times: [None; 16],
        })
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            // Report runs that ended by themselves
            match self.executor.poll() {
                Some(Ok(Halt::Breakpoint { address })) => {
                    self.output = format!("Hit breakpoint at {address:03X}");
                }
                Some(Ok(Halt::Stopped)) => {
                    self.output = "Stopped".to_string();
                }
                Some(Err(e)) => {
                    self.output = e.to_string();
                }
                None => {}
            }

            self.state = self.executor.snapshot();
            terminal.draw(|frame| self.draw(frame))?;

            self.check_key_timeout();

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_event(key);
                }
            }
        }

        if self.executor.is_running() {
            self.executor.pause()?;
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn key_mask(&self) -> u16 {
        self.key_press_times
            .iter()
            .enumerate()
            .filter(|(_, time)| time.is_some())
            .fold(0, |mask, (idx, _)| mask | 1 << idx)
    }

    fn check_key_timeout(&mut self) {
        let now = Instant::now();
        let mut released = false;

        for press_time in self.key_press_times.iter_mut() {
            if let Some(time) = press_time
                && now.duration_since(*time) > KEY_RELEASE_TIMEOUT
            {
                *press_time = None;
                released = true;
            }
        }

        if released {
            self.executor.keyboard().update(self.key_mask());
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Handle Ctrl+C globally
        if key.code == KeyCode::Char('c') && key.modifiers.contains(event::KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.executor.is_running() {
            match key.code {
                KeyCode::Esc => {
                    self.output = match self.executor.pause() {
                        Ok(_) => "Paused".to_string(),
                        Err(e) => e.to_string(),
                    };
                }
                _ => {
                    if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                        self.key_press_times[idx] = Some(Instant::now());
                        self.executor.keyboard().update(self.key_mask());
                    }
                }
            }
        } else if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Enter => {
                    self.handle_enter();
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                _ => {}
            }
        }
    }

    fn handle_enter(&mut self) {
        if self.input.is_empty() {
            // Repeat the previous command
            if let Some(command) = self.last_command.clone() {
                self.execute_command(command);
            }
        } else {
            match Cli::try_parse_from(self.input.split_whitespace()) {
                Ok(cli) => {
                    self.last_command = Some(cli.command.clone());
                    self.execute_command(cli.command);
                }
                Err(e) => {
                    self.output = e.to_string();
                    self.last_command = None;
                }
            }
        }

        self.input.clear();
    }

    fn execute_command(&mut self, command: Command) {
        self.output = match self.executor.execute(command) {
            Ok(CommandResult::Ok) => "OK".to_string(),
            Ok(CommandResult::AwaitingKey) => "Waiting for a key (Fx0A)".to_string(),
            Ok(CommandResult::Quit) => {
                self.should_quit = true;
                String::new()
            }
            Ok(CommandResult::Breakpoints(breakpoints)) => {
                let list: Vec<String> = breakpoints.iter().map(|a| format!("{a:03X}")).collect();
                format!("Breakpoints: [{}]", list.join(", "))
            }
            Ok(CommandResult::MemDump { data, offset }) => {
                let mut output = String::new();
                for (i, byte) in data.iter().enumerate() {
                    if i % 16 == 0 {
                        let _ = write!(output, "\n{:03X}: ", offset as usize + i);
                    }
                    let _ = write!(output, "{byte:02X} ");
                }
                output
            }
            Ok(CommandResult::Disasm { lines }) => {
                let mut output = String::new();
                for line in lines {
                    let marker = if line.address == self.state.pc { '>' } else { ' ' };
                    let _ = writeln!(output, "{marker}{line}");
                }
                output
            }
            Err(e) => e.to_string(),
        };
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Check if we have enough space
        const MIN_WIDTH: u16 = DISPLAY_X as u16 + 2 + 17 + 2;
        const MIN_HEIGHT: u16 = DISPLAY_Y as u16 + 2 + 1 + 2 + 1 + 2;
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!(
                "Terminal is too small ({}x{} min)",
                MIN_WIDTH, MIN_HEIGHT
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::bordered())
            .render(center, buf);

            return;
        }

        let [left, right] = Layout::horizontal([
            Constraint::Min(DISPLAY_X as u16 + 2),
            Constraint::Length(17 + 2),
        ])
        .areas(area);

        let [display, output, input] = Layout::vertical([
            Constraint::Length(DISPLAY_Y as u16 + 2),
            Constraint::Min(1 + 2),
            Constraint::Length(1 + 2),
        ])
        .areas(left);

        let [state, registers, keypad, stack] = Layout::vertical([
            Constraint::Length(1 + 2),
            Constraint::Length(11 + 2),
            Constraint::Length(4 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(right);

        self.render_display(display, buf);
        self.render_state(state, buf);
        self.render_registers(registers, buf);
        self.render_keypad(keypad, buf);
        self.render_stack(stack, buf);
        self.render_output(output, buf);
        self.render_input(input, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let text: Vec<Line> = self
            .executor
            .frame_buffer()
            .rows()
            .iter()
            .map(|&row| {
                (0..DISPLAY_X)
                    .map(|x| {
                        let lit = row & column_bit(x) != 0;
                        Span::styled(if lit { "█" } else { " " }, Style::default().fg(Color::Green))
                    })
                    .collect()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Display "))
            .render(area, buf);
    }

    fn render_registers(&self, area: Rect, buf: &mut Buffer) {
        let state = &self.state;
        let mut lines = Vec::new();

        lines.push(Line::from(format!("PC: {:03X}  I: {:03X}", state.pc, state.i)));
        lines.push(Line::from(format!(
            "DT: {:02X}   ST: {:02X}",
            state.delay_timer, state.sound_timer
        )));
        lines.push(Line::from(""));

        for idx in 0..8 {
            lines.push(Line::from(format!(
                "V{:X}: {:02X}   V{:X}: {:02X}",
                idx,
                state.v[idx],
                idx + 8,
                state.v[idx + 8]
            )));
        }

        Paragraph::new(lines)
            .block(Block::bordered().title(" Registers "))
            .render(area, buf);
    }

    fn render_stack(&self, area: Rect, buf: &mut Buffer) {
        let max_lines = (area.height as usize).saturating_sub(2).max(1);

        let mut lines: Vec<Line> = self
            .state
            .stack
            .iter()
            .enumerate()
            .map(|(i, val)| Line::from(format!("{:02}: {:03X}", i, val)))
            .collect();

        if lines.is_empty() {
            lines.push(Line::from("Empty"));
        }

        if lines.len() > max_lines {
            // Display only the last `max_lines - 1` items with "..." at the top
            lines = std::iter::once(Line::from("..."))
                .chain(lines.into_iter().rev().take(max_lines - 1).rev())
                .collect();
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Stack "))
            .render(area, buf);
    }

    fn render_output(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.output.as_str())
            .block(Block::bordered().title(" Output "))
            .render(area, buf);
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.input.as_str())
            .block(Block::bordered().title(" Command "))
            .render(area, buf);
    }

    fn render_state(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = if self.executor.is_running() {
            ("RUNNING", Color::Green)
        } else {
            ("PAUSED", Color::Yellow)
        };

        Paragraph::new(Text::styled(text, Style::default().fg(color)))
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" State "))
            .render(area, buf);
    }

    fn render_keypad(&self, area: Rect, buf: &mut Buffer) {
        let mask = self.executor.keyboard().mask();
        let layout = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];

        let lines = layout
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&key| {
                        Span::styled(
                            format!("{:X}", key),
                            if mask & (1 << key) != 0 {
                                Style::default().fg(Color::Black).bg(Color::White)
                            } else {
                                Style::default()
                            },
                        )
                    })
                    .flat_map(|s| [s, Span::raw(" ")])
                    .take(row.len() * 2 - 1)
                    .collect()
            })
            .collect::<Vec<Line>>();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Keypad "))
            .render(area, buf);
    }
}

/// Opens the terminal debugger, paused at the program entry point.
pub fn run(args: &MachineArgs) -> anyhow::Result<()> {
    let mut app = App::new(args)?;

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    app_result
}
