use arrayvec::ArrayVec;
use core::time::Duration;
use log::{debug, trace, warn};

use crate::consts::*;
use crate::song::{Instrument, Note, Pattern, Song, Timer};

/// Playback command for the synthesizer driving the OPL2 channels.
///
/// Translating an octave/note pair into an F-number and block is left to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Program `channel` with the instrument in 1-based `slot`.
    SetInstrument {
        channel: u8,
        slot: u8,
        instrument: Instrument,
    },
    /// Set the pitch of `channel`. `note` is `1..=14`.
    SetFrequency { channel: u8, octave: u8, note: u8 },
    KeyOn { channel: u8 },
    KeyOff { channel: u8 },
}

/// Commands produced by a single tick.
pub type Commands = ArrayVec<Command, MAX_COMMANDS>;

/// What happens when the order list runs out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Looping {
    /// Restart from the first order.
    Enabled,
    /// Stop with [`State::Ended`].
    #[default]
    Disabled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub looping: Looping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No song loaded.
    Idle,
    Playing,
    /// The last order finished and looping is disabled.
    Ended,
}

/// Result of [`Sequencer::advance_one_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Commands(Commands),
    Ended,
}

/// Tick-driven walker over a `Song`'s orders, rows and channels.
///
/// The sequencer owns no clock. Call [`Sequencer::advance_one_tick`] once per tick and wait
/// [`Sequencer::delay_after`] between calls. `Sequencer` also implements `Iterator`, yielding
/// the commands of each tick until the song ends.
///
/// ```ignore
/// let mut sequencer = Sequencer::new(PlaybackConfig::default());
/// sequencer.load(&song);
/// for commands in sequencer {
///     // Forward commands to the synth, then wait one tick
/// }
/// ```
#[derive(Debug)]
pub struct Sequencer<'a> {
    song: Option<&'a Song>,
    pattern: Option<&'a Pattern>,
    config: PlaybackConfig,
    state: State,

    // Playback position
    order: usize,
    row: usize,
    tick: u8,
    speed: u8,
}

impl<'a> Sequencer<'a> {
    /// Create an idle `Sequencer`.
    pub fn new(config: PlaybackConfig) -> Self {
        Sequencer {
            song: None,
            pattern: None,
            config,
            state: State::Idle,
            order: 0,
            row: 0,
            tick: 0,
            speed: 1,
        }
    }

    /// Load a song and start playing it from the first order.
    pub fn load(&mut self, song: &'a Song) {
        self.song = Some(song);
        self.rewind();
    }

    /// Return to the first order, row and tick of the loaded song.
    pub fn rewind(&mut self) {
        let song = match self.song {
            Some(song) => song,
            None => return,
        };

        self.order = 0;
        self.row = 0;
        self.tick = 0;
        // Ticks per row can't be zero
        self.speed = song.initial_speed().max(1);
        self.pattern = song.order_pattern(0);
        self.state = if self.pattern.is_some() {
            State::Playing
        } else {
            State::Ended
        };

        debug!(
            "Playback start: {} orders, speed {}, {:?} timer",
            song.orders().len(),
            self.speed,
            song.timer(),
        );
    }

    /// Unload the song.
    pub fn stop(&mut self) {
        self.song = None;
        self.pattern = None;
        self.state = State::Idle;
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    pub fn set_looping(&mut self, looping: Looping) {
        self.config.looping = looping;
    }

    /// Current `(order, row, tick)`.
    pub fn position(&self) -> (usize, usize, u8) {
        (self.order, self.row, self.tick)
    }

    /// Ticks per row.
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Nominal tick length of the loaded song.
    pub fn tick_duration(&self) -> Duration {
        self.song
            .map(Song::timer)
            .unwrap_or(Timer::Normal)
            .tick_duration()
    }

    /// Time left to wait after a tick that took `elapsed` to process, never negative.
    pub fn delay_after(&self, elapsed: Duration) -> Duration {
        self.tick_duration().saturating_sub(elapsed)
    }

    /// Run one tick. On the first tick of a row every channel's cell is turned into
    /// commands; other ticks only advance the position.
    pub fn advance_one_tick(&mut self) -> Tick {
        let (song, pattern) = match (self.state, self.song, self.pattern) {
            (State::Playing, Some(song), Some(pattern)) => (song, pattern),
            (State::Idle, ..) => return Tick::Idle,
            _ => return Tick::Ended,
        };

        let mut commands = Commands::new();
        if self.tick == 0 {
            self.trigger_row(song, pattern, &mut commands);
        }

        self.tick = (self.tick + 1) % self.speed;
        if self.tick == 0 {
            self.row = (self.row + 1) % NUM_ROWS;
            if self.row == 0 {
                self.next_order(song);
            }
        }

        Tick::Commands(commands)
    }

    fn trigger_row(&self, song: &Song, pattern: &Pattern, commands: &mut Commands) {
        for (channel, cell) in pattern.row(self.row).iter().enumerate() {
            let channel = channel as u8;

            match cell.note() {
                Note::Empty => (),
                Note::Off => commands.push(Command::KeyOff { channel }),
                Note::Pitch(note) => {
                    if cell.instrument != 0 {
                        match song.instrument(cell.instrument) {
                            Some(&instrument) => commands.push(Command::SetInstrument {
                                channel,
                                slot: cell.instrument,
                                instrument,
                            }),
                            None => warn!(
                                "Channel {} references undefined instrument {}",
                                channel, cell.instrument
                            ),
                        }
                    }
                    commands.push(Command::SetFrequency {
                        channel,
                        octave: cell.octave,
                        note,
                    });
                    commands.push(Command::KeyOn { channel });
                }
            }
        }

        trace!(
            "Order {} row {}: {} commands",
            self.order,
            self.row,
            commands.len()
        );
    }

    fn next_order(&mut self, song: &'a Song) {
        self.order += 1;
        if self.order >= song.orders().len() {
            match self.config.looping {
                Looping::Enabled => {
                    debug!("Looping back to order 0");
                    self.order = 0;
                }
                Looping::Disabled => {
                    debug!("Song ended after {} orders", song.orders().len());
                    self.state = State::Ended;
                    return;
                }
            }
        }

        self.pattern = song.order_pattern(self.order);
        if self.pattern.is_none() {
            self.state = State::Ended;
        }
    }
}

impl<'a> Iterator for Sequencer<'a> {
    type Item = Commands;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance_one_tick() {
            Tick::Commands(commands) => Some(commands),
            Tick::Idle | Tick::Ended => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec::Vec;
    use arrayvec::ArrayVec;

    use crate::song::{Cell, Operator};

    fn instrument() -> Instrument {
        Instrument {
            carrier: Operator {
                props: 0x01,
                level: 0x02,
                attack_decay: 0x03,
                sustain_release: 0x04,
                waveform: 0x05,
            },
            modulator: Operator::default(),
            channel_props: 0x0e,
        }
    }

    /// A song with one defined instrument and the given orders, all slots holding `pattern`.
    fn song(speed: u8, orders: &[u8], pattern: Pattern) -> Song {
        let mut instruments = [None; NUM_INSTRUMENTS];
        instruments[0] = Some(instrument());

        let mut patterns: [Option<Box<Pattern>>; NUM_PATTERNS] = Default::default();
        for &slot in orders {
            patterns[usize::from(slot)] = Some(Box::new(pattern.clone()));
        }

        Song {
            timer: Timer::Normal,
            initial_speed: speed,
            description: Vec::new(),
            instruments,
            orders: orders.iter().copied().collect::<ArrayVec<_, 255>>(),
            patterns,
        }
    }

    fn commands(tick: Tick) -> Commands {
        match tick {
            Tick::Commands(commands) => commands,
            other => panic!("expected commands, got {:?}", other),
        }
    }

    #[test]
    fn idle_without_song() {
        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        assert_eq!(sequencer.state(), State::Idle);
        assert_eq!(sequencer.advance_one_tick(), Tick::Idle);
        assert_eq!(sequencer.next(), None);
    }

    #[test]
    fn note_trigger() {
        let mut pattern = Pattern::new(0x100);
        *pattern.cell_mut(0, 0) = Cell {
            instrument: 1,
            octave: 4,
            note: 1,
            effect: 0,
            parameter: 0,
        };
        let song = song(6, &[2], pattern);

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        let commands = commands(sequencer.advance_one_tick());

        assert_eq!(
            commands.as_slice(),
            &[
                Command::SetInstrument {
                    channel: 0,
                    slot: 1,
                    instrument: instrument(),
                },
                Command::SetFrequency {
                    channel: 0,
                    octave: 4,
                    note: 1,
                },
                Command::KeyOn { channel: 0 },
            ]
        );
    }

    #[test]
    fn note_without_instrument() {
        let mut pattern = Pattern::new(0x100);
        pattern.cell_mut(0, 8).octave = 2;
        pattern.cell_mut(0, 8).note = 14;
        let song = song(3, &[0], pattern);

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);

        assert_eq!(
            commands(sequencer.advance_one_tick()).as_slice(),
            &[
                Command::SetFrequency {
                    channel: 8,
                    octave: 2,
                    note: 14,
                },
                Command::KeyOn { channel: 8 },
            ]
        );
    }

    #[test]
    fn undefined_instrument_is_skipped() {
        let mut pattern = Pattern::new(0x100);
        *pattern.cell_mut(0, 1) = Cell {
            instrument: 9,
            octave: 3,
            note: 5,
            effect: 0,
            parameter: 0,
        };
        let song = song(1, &[0], pattern);

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);

        assert_eq!(
            commands(sequencer.advance_one_tick()).as_slice(),
            &[
                Command::SetFrequency {
                    channel: 1,
                    octave: 3,
                    note: 5,
                },
                Command::KeyOn { channel: 1 },
            ]
        );
    }

    #[test]
    fn key_off() {
        let mut pattern = Pattern::new(0x100);
        *pattern.cell_mut(5, 3) = Cell {
            instrument: 1,
            octave: 4,
            note: 15,
            effect: 3,
            parameter: 0x10,
        };
        let song = song(2, &[0], pattern);

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        for _ in 0..5 * 2 {
            assert!(commands(sequencer.advance_one_tick()).is_empty());
        }

        assert_eq!(sequencer.position(), (0, 5, 0));
        assert_eq!(
            commands(sequencer.advance_one_tick()).as_slice(),
            &[Command::KeyOff { channel: 3 }]
        );
        assert!(commands(sequencer.advance_one_tick()).is_empty());
    }

    #[test]
    fn speed_ticks_per_row() {
        let song = song(4, &[0], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        for tick in 0..4 {
            assert_eq!(sequencer.position(), (0, 0, tick));
            sequencer.advance_one_tick();
        }
        assert_eq!(sequencer.position(), (0, 1, 0));
    }

    #[test]
    fn ends_without_looping() {
        let song = song(3, &[0], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        for _ in 0..3 * 64 {
            assert_eq!(sequencer.state(), State::Playing);
            commands(sequencer.advance_one_tick());
        }

        assert_eq!(sequencer.state(), State::Ended);
        assert_eq!(sequencer.advance_one_tick(), Tick::Ended);
        assert_eq!(sequencer.advance_one_tick(), Tick::Ended);
    }

    #[test]
    fn loops_back_to_first_order() {
        let mut pattern = Pattern::new(0x100);
        pattern.cell_mut(0, 0).note = 1;
        let song = song(1, &[0, 1], pattern);

        let config = PlaybackConfig {
            looping: Looping::Enabled,
        };
        let mut sequencer = Sequencer::new(config);
        sequencer.load(&song);

        let triggers = sequencer
            .by_ref()
            .take(64 * 5)
            .filter(|commands| !commands.is_empty())
            .count();

        assert_eq!(triggers, 5);
        assert_eq!(sequencer.state(), State::Playing);
        assert_eq!(sequencer.position(), (1, 0, 0));
    }

    #[test]
    fn iterator_stops_at_song_end() {
        let song = song(2, &[0, 0, 0], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        assert_eq!(sequencer.by_ref().count(), 2 * 64 * 3);
        assert_eq!(sequencer.state(), State::Ended);
    }

    #[test]
    fn zero_speed_plays_one_tick_per_row() {
        let song = song(0, &[0], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        assert_eq!(sequencer.speed(), 1);
        sequencer.advance_one_tick();
        assert_eq!(sequencer.position(), (0, 1, 0));
    }

    #[test]
    fn empty_order_list_ends_immediately() {
        let song = song(6, &[], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        assert_eq!(sequencer.state(), State::Ended);
        assert_eq!(sequencer.advance_one_tick(), Tick::Ended);
    }

    #[test]
    fn rewind_and_stop() {
        let song = song(6, &[0], Pattern::new(0x100));

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        sequencer.load(&song);
        for _ in 0..20 {
            sequencer.advance_one_tick();
        }
        assert_eq!(sequencer.position(), (0, 3, 2));

        sequencer.rewind();
        assert_eq!(sequencer.position(), (0, 0, 0));
        assert_eq!(sequencer.state(), State::Playing);

        sequencer.stop();
        assert_eq!(sequencer.state(), State::Idle);
        assert_eq!(sequencer.advance_one_tick(), Tick::Idle);
    }

    #[test]
    fn delay_is_clamped() {
        let mut slow = song(6, &[0], Pattern::new(0x100));
        slow.timer = Timer::Slow;

        let mut sequencer = Sequencer::new(PlaybackConfig::default());
        assert_eq!(sequencer.tick_duration(), Duration::from_millis(20));

        sequencer.load(&slow);
        assert_eq!(
            sequencer.delay_after(Duration::from_millis(5)),
            Duration::from_millis(50)
        );
        assert_eq!(
            sequencer.delay_after(Duration::from_millis(80)),
            Duration::ZERO
        );
    }
}
