mod program_core;
