use rookery::{perft, BoardState, STARTPOS};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const PROMOTIONS: &str = "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1";

fn test_perft_fen_nodes(depth: u32, fen: &str, expected: u64) {
    let mut board = BoardState::from_fen(fen).unwrap();
    let before = board;
    let nodes = perft(&mut board, depth);
    assert_eq!(nodes, expected, "perft({depth}) failed on {fen}");
    assert_eq!(board, before, "perft({depth}) did not restore {fen}");
}

#[cfg(test)]
mod startpos_perft {
    use super::*;

    #[test]
    fn test_startpos_perft_1() {
        test_perft_fen_nodes(1, STARTPOS, 20);
    }
    #[test]
    fn test_startpos_perft_2() {
        test_perft_fen_nodes(2, STARTPOS, 400);
    }
    #[test]
    fn test_startpos_perft_3() {
        test_perft_fen_nodes(3, STARTPOS, 8902);
    }
    #[test]
    fn test_startpos_perft_4() {
        test_perft_fen_nodes(4, STARTPOS, 197_281);
    }
}

#[cfg(test)]
mod kiwipete_perft {
    use super::*;

    #[test]
    fn test_kiwipete_perft_1() {
        test_perft_fen_nodes(1, KIWIPETE, 48);
    }
    #[test]
    fn test_kiwipete_perft_2() {
        test_perft_fen_nodes(2, KIWIPETE, 2039);
    }
    #[test]
    fn test_kiwipete_perft_3() {
        test_perft_fen_nodes(3, KIWIPETE, 97_862);
    }
}

#[cfg(test)]
mod endgame_perft {
    use super::*;

    #[test]
    fn test_endgame_perft_1() {
        test_perft_fen_nodes(1, ENDGAME, 14);
    }
    #[test]
    fn test_endgame_perft_2() {
        test_perft_fen_nodes(2, ENDGAME, 191);
    }
    #[test]
    fn test_endgame_perft_3() {
        test_perft_fen_nodes(3, ENDGAME, 2812);
    }
    #[test]
    fn test_endgame_perft_4() {
        test_perft_fen_nodes(4, ENDGAME, 43_238);
    }
}

#[cfg(test)]
mod promotion_perft {
    use super::*;

    #[test]
    fn test_promotion_perft_1() {
        test_perft_fen_nodes(1, PROMOTIONS, 24);
    }
    #[test]
    fn test_promotion_perft_2() {
        test_perft_fen_nodes(2, PROMOTIONS, 496);
    }
    #[test]
    fn test_promotion_perft_3() {
        test_perft_fen_nodes(3, PROMOTIONS, 9483);
    }
}

#[test]
fn test_position_4_perft() {
    let fen = "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1";
    test_perft_fen_nodes(1, fen, 6);
    test_perft_fen_nodes(2, fen, 264);
    test_perft_fen_nodes(3, fen, 9467);
}

#[test]
fn test_position_5_perft() {
    let fen = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
    test_perft_fen_nodes(1, fen, 44);
    test_perft_fen_nodes(2, fen, 1486);
    test_perft_fen_nodes(3, fen, 62_379);
}
